//! Service helpers behind the open board routes: reading the board and registering players.

use crate::{
    dto::board::{AddPlayerRequest, BoardView, PlayerView, QueueView, queue_view},
    error::ServiceError,
    services::command_processor::{self, Intent, Outcome},
    state::{SharedState, board::PlayerStatus, capability::Actor, clock},
};

/// Return the whole board as currently cached.
pub async fn board_view(state: &SharedState) -> BoardView {
    BoardView::build(&state.board().await, clock::now_ms())
}

/// Return one waiting queue by zero-based index.
pub async fn queue(state: &SharedState, index: usize) -> Result<QueueView, ServiceError> {
    let board = state.board().await;
    queue_view(&board, index)
        .ok_or_else(|| ServiceError::NotFound(format!("queue {} not found", index + 1)))
}

/// Register a new idle player.
pub async fn add_player(
    state: &SharedState,
    actor: Actor,
    client: &str,
    request: AddPlayerRequest,
) -> Result<PlayerView, ServiceError> {
    let intent = Intent::AddPlayer {
        name: request.name,
        grade: request.grade,
        gender: request.gender,
    };
    let player = match command_processor::submit(state, actor, client, intent).await? {
        Outcome::PlayerAdded(player) => player,
        other => {
            return Err(ServiceError::InvalidInput(format!(
                "unexpected outcome {other:?} for registration"
            )));
        }
    };

    // a fresh registration is neither queued nor playing
    Ok(PlayerView::new(&player, PlayerStatus::default()))
}
