use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use serde::Deserialize;

use crate::{
    dto::admin::{
        ActionResponse, AssignCourtRequest, ConfirmQuery, MoveToQueueRequest,
        QueueTargetsResponse, ResetRequest, SelectionResponse,
    },
    error::AppError,
    routes::client_id,
    services::admin_service,
    state::{
        SharedState,
        board::{CourtId, PlayerId},
        capability::Actor,
    },
};

const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Operator endpoints: selection, queues, courts and roster maintenance.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/admin/selection",
            get(get_selection).delete(clear_selection),
        )
        .route("/admin/selection/targets", get(queue_targets))
        .route("/admin/selection/{player_id}", post(toggle_selection))
        .route("/admin/queues", post(move_to_queue))
        .route(
            "/admin/queues/{index}/players/{player_id}",
            delete(remove_from_queue),
        )
        .route("/admin/courts/{court_id}/assign", post(assign_court))
        .route("/admin/courts/{court_id}/clear", post(clear_court))
        .route("/admin/players/{player_id}", delete(remove_player))
        .route("/admin/reset", post(reset_board))
        .route_layer(middleware::from_fn_with_state(state, require_admin_key))
}

/// Return the caller's pending selection.
#[utoipa::path(
    get,
    path = "/admin/selection",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("X-Client-Id" = Option<String>, Header, description = "Key of the caller's selection")
    ),
    responses((status = 200, description = "Current selection", body = SelectionResponse))
)]
pub async fn get_selection(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Json<SelectionResponse> {
    Json(admin_service::selection(&state, &client_id(&headers)).await)
}

/// Add or remove a player from the caller's selection.
#[utoipa::path(
    post,
    path = "/admin/selection/{player_id}",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("X-Client-Id" = Option<String>, Header, description = "Key of the caller's selection"),
        ("player_id" = u64, Path, description = "Player to toggle")
    ),
    responses(
        (status = 200, description = "Selection updated", body = SelectionResponse),
        (status = 400, description = "Selection full or player already queued"),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn toggle_selection(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(player_id): Path<PlayerId>,
) -> Result<Json<SelectionResponse>, AppError> {
    let response =
        admin_service::toggle_selection(&state, actor, &client_id(&headers), player_id).await?;
    Ok(Json(response))
}

/// Empty the caller's selection.
#[utoipa::path(
    delete,
    path = "/admin/selection",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("X-Client-Id" = Option<String>, Header, description = "Key of the caller's selection")
    ),
    responses((status = 200, description = "Selection cleared", body = SelectionResponse))
)]
pub async fn clear_selection(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
) -> Result<Json<SelectionResponse>, AppError> {
    let response = admin_service::clear_selection(&state, actor, &client_id(&headers)).await?;
    Ok(Json(response))
}

/// Preview where the current selection could be queued.
#[utoipa::path(
    get,
    path = "/admin/selection/targets",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("X-Client-Id" = Option<String>, Header, description = "Key of the caller's selection")
    ),
    responses(
        (status = 200, description = "Eligible queues", body = QueueTargetsResponse),
        (status = 400, description = "Selection is empty")
    )
)]
pub async fn queue_targets(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<QueueTargetsResponse>, AppError> {
    Ok(Json(
        admin_service::queue_targets(&state, &client_id(&headers)).await?,
    ))
}

/// Enqueue the caller's selection.
///
/// Without the needed answers the response is `428` carrying the prompt;
/// resend with `confirm_playing` and/or `target` set.
#[utoipa::path(
    post,
    path = "/admin/queues",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("X-Client-Id" = Option<String>, Header, description = "Key of the caller's selection")
    ),
    request_body = MoveToQueueRequest,
    responses(
        (status = 200, description = "Selection queued", body = ActionResponse),
        (status = 400, description = "Invalid selection"),
        (status = 428, description = "Confirmation or queue choice required")
    )
)]
pub async fn move_to_queue(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(request): Json<MoveToQueueRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response =
        admin_service::move_to_queue(&state, actor, &client_id(&headers), request).await?;
    Ok(Json(response))
}

/// Take a player out of a waiting queue.
#[utoipa::path(
    delete,
    path = "/admin/queues/{index}/players/{player_id}",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("index" = usize, Path, description = "Zero-based queue index"),
        ("player_id" = u64, Path, description = "Player to remove"),
        ("confirm" = Option<bool>, Query, description = "Answer to the confirmation prompt")
    ),
    responses(
        (status = 200, description = "Player removed", body = ActionResponse),
        (status = 404, description = "Queue or player not found"),
        (status = 428, description = "Confirmation required")
    )
)]
pub async fn remove_from_queue(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path((index, player_id)): Path<(usize, PlayerId)>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = admin_service::remove_from_queue(
        &state,
        actor,
        &client_id(&headers),
        index,
        player_id,
        query.confirm,
    )
    .await?;
    Ok(Json(response))
}

/// Move a full queue onto a court.
#[utoipa::path(
    post,
    path = "/admin/courts/{court_id}/assign",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("court_id" = u32, Path, description = "Court to fill")
    ),
    request_body = AssignCourtRequest,
    responses(
        (status = 200, description = "Court assigned", body = ActionResponse),
        (status = 400, description = "Queue does not hold four players"),
        (status = 409, description = "Players already on another court")
    )
)]
pub async fn assign_court(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(court_id): Path<CourtId>,
    Json(request): Json<AssignCourtRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response =
        admin_service::assign_court(&state, actor, &client_id(&headers), court_id, request)
            .await?;
    Ok(Json(response))
}

/// Free a court.
#[utoipa::path(
    post,
    path = "/admin/courts/{court_id}/clear",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("court_id" = u32, Path, description = "Court to clear")
    ),
    responses(
        (status = 200, description = "Court cleared", body = ActionResponse),
        (status = 404, description = "Unknown court")
    )
)]
pub async fn clear_court(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(court_id): Path<CourtId>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = admin_service::clear_court(&state, actor, &client_id(&headers), court_id).await?;
    Ok(Json(response))
}

/// Delete a player from the roster and every queue.
#[utoipa::path(
    delete,
    path = "/admin/players/{player_id}",
    tag = "admin",
    params(
        ("X-Admin-Key" = String, Header, description = "Operator secret"),
        ("player_id" = u64, Path, description = "Player to delete"),
        ("confirm" = Option<bool>, Query, description = "Answer to the confirmation prompt")
    ),
    responses(
        (status = 200, description = "Player removed", body = ActionResponse),
        (status = 404, description = "Unknown player"),
        (status = 428, description = "Confirmation required")
    )
)]
pub async fn remove_player(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(player_id): Path<PlayerId>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = admin_service::remove_player(
        &state,
        actor,
        &client_id(&headers),
        player_id,
        query.confirm,
    )
    .await?;
    Ok(Json(response))
}

/// Wipe the roster, queues and courts.
#[utoipa::path(
    post,
    path = "/admin/reset",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Operator secret")),
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Board reset", body = ActionResponse),
        (status = 428, description = "Confirmation required")
    )
)]
pub async fn reset_board(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = admin_service::reset(&state, actor, &client_id(&headers), request).await?;
    Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
struct AdminKeyQuery {
    admin: Option<String>,
}

/// Reject requests without the operator secret and attach the admin actor otherwise.
async fn require_admin_key(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let from_header = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned());
    let provided = from_header
        .or_else(|| {
            Query::<AdminKeyQuery>::try_from_uri(req.uri())
                .ok()
                .and_then(|Query(query)| query.admin)
        })
        .ok_or_else(|| AppError::Unauthorized("missing admin key header `X-Admin-Key`".into()))?;

    let capability = state
        .config()
        .admin_key()
        .verify(&provided)
        .ok_or_else(|| AppError::Unauthorized("invalid admin key".into()))?;

    req.extensions_mut().insert(Actor::Admin(capability));
    Ok(next.run(req).await)
}
