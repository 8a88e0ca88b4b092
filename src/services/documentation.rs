use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the badminton board.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::board::get_board,
        crate::routes::board::get_queue,
        crate::routes::board::add_player,
        crate::routes::admin::get_selection,
        crate::routes::admin::toggle_selection,
        crate::routes::admin::clear_selection,
        crate::routes::admin::queue_targets,
        crate::routes::admin::move_to_queue,
        crate::routes::admin::remove_from_queue,
        crate::routes::admin::assign_court,
        crate::routes::admin::clear_court,
        crate::routes::admin::remove_player,
        crate::routes::admin::reset_board,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::board::BoardView,
            crate::dto::board::PlayerView,
            crate::dto::board::PlayerState,
            crate::dto::board::PlayerSummary,
            crate::dto::board::CourtView,
            crate::dto::board::QueueView,
            crate::dto::board::AddPlayerRequest,
            crate::dto::admin::QueueTargetInput,
            crate::dto::admin::MoveToQueueRequest,
            crate::dto::admin::AssignCourtRequest,
            crate::dto::admin::ResetRequest,
            crate::dto::admin::SelectionResponse,
            crate::dto::admin::QueueTargetsResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::PlayersChangedEvent,
            crate::dto::sse::CourtsChangedEvent,
            crate::dto::sse::QueuesChangedEvent,
            crate::dto::sse::CourtClock,
            crate::dto::sse::CourtClockEvent,
            crate::state::board::Grade,
            crate::state::board::Gender,
            crate::state::engine::Prompt,
            crate::state::engine::QueueOption,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "board", description = "Board reads and open registration"),
        (name = "admin", description = "Operator actions guarded by the admin key"),
    )
)]
pub struct ApiDoc;
