use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::board::{AddPlayerRequest, BoardView, PlayerView, QueueView},
    error::AppError,
    routes::client_id,
    services::board_service,
    state::{SharedState, capability::Actor},
};

/// Open routes: reading the board and self-registration.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/board", get(get_board))
        .route("/board/queues/{index}", get(get_queue))
        .route("/players", post(add_player))
}

/// Return players, courts and waiting queues.
#[utoipa::path(
    get,
    path = "/board",
    tag = "board",
    responses((status = 200, description = "Current board", body = BoardView))
)]
pub async fn get_board(State(state): State<SharedState>) -> Json<BoardView> {
    Json(board_service::board_view(&state).await)
}

/// Return one waiting queue.
#[utoipa::path(
    get,
    path = "/board/queues/{index}",
    tag = "board",
    params(("index" = usize, Path, description = "Zero-based queue index")),
    responses(
        (status = 200, description = "Queue found", body = QueueView),
        (status = 404, description = "No queue at this index")
    )
)]
pub async fn get_queue(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<QueueView>, AppError> {
    Ok(Json(board_service::queue(&state, index).await?))
}

/// Register a new player. Open to everyone.
#[utoipa::path(
    post,
    path = "/players",
    tag = "board",
    request_body = AddPlayerRequest,
    responses(
        (status = 201, description = "Player registered", body = PlayerView),
        (status = 400, description = "Invalid name"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn add_player(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Valid(Json(request)): Valid<Json<AddPlayerRequest>>,
) -> Result<(StatusCode, Json<PlayerView>), AppError> {
    let player =
        board_service::add_player(&state, Actor::Public, &client_id(&headers), request).await?;
    Ok((StatusCode::CREATED, Json(player)))
}
