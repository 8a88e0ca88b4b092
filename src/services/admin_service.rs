//! Business logic powering the admin REST routes.
//!
//! Every mutation is handed to the command processor; these helpers only
//! translate request DTOs into intents and outcomes back into responses.

use crate::{
    dto::admin::{
        ActionResponse, AssignCourtRequest, MoveToQueueRequest, QueueTargetsResponse,
        ResetRequest, SelectionResponse,
    },
    error::ServiceError,
    services::command_processor::{self, Intent, Outcome},
    state::{
        SharedState,
        board::{CourtId, PlayerId},
        capability::Actor,
        engine::Decision,
        selection::{SELECTION_CAPACITY, SelectionSet},
    },
};

async fn selection_response(
    state: &SharedState,
    client: &str,
    selection: &SelectionSet,
    selected: Option<bool>,
) -> SelectionResponse {
    let players = selection.ids();
    let names = state.board().await.names_of(&players);
    SelectionResponse {
        client: client.to_string(),
        players,
        names,
        capacity: SELECTION_CAPACITY,
        selected,
    }
}

/// Return the caller's pending selection.
pub async fn selection(state: &SharedState, client: &str) -> SelectionResponse {
    let current = state.selection(client);
    selection_response(state, client, &current, None).await
}

/// Add or remove one player from the caller's selection.
pub async fn toggle_selection(
    state: &SharedState,
    actor: Actor,
    client: &str,
    player_id: PlayerId,
) -> Result<SelectionResponse, ServiceError> {
    let intent = Intent::ToggleSelection { player_id };
    selection_outcome(state, client, command_processor::submit(state, actor, client, intent).await?)
        .await
}

/// Empty the caller's selection.
pub async fn clear_selection(
    state: &SharedState,
    actor: Actor,
    client: &str,
) -> Result<SelectionResponse, ServiceError> {
    let outcome = command_processor::submit(state, actor, client, Intent::ClearSelection).await?;
    selection_outcome(state, client, outcome).await
}

async fn selection_outcome(
    state: &SharedState,
    client: &str,
    outcome: Outcome,
) -> Result<SelectionResponse, ServiceError> {
    match outcome {
        Outcome::Selection {
            selection,
            selected,
        } => Ok(selection_response(state, client, &selection, selected).await),
        other => Err(unexpected(other)),
    }
}

/// List where the caller's selection could be queued.
pub async fn queue_targets(
    state: &SharedState,
    client: &str,
) -> Result<QueueTargetsResponse, ServiceError> {
    let selection = state.selection(client);
    let size = selection.len();
    if size == 0 {
        return Err(ServiceError::InvalidInput("selection is empty".into()));
    }

    let board = state.board().await;
    let playing: Vec<PlayerId> = selection
        .ids()
        .into_iter()
        .filter(|id| board.status_of(*id).court.is_some())
        .collect();
    let new_queue_only = size > 2;

    Ok(QueueTargetsResponse {
        selection_size: size,
        new_queue_only,
        options: if new_queue_only {
            Vec::new()
        } else {
            state.engine().queue_options(&board, size)
        },
        new_queue_index: board.queues.len(),
        playing: board.names_of(&playing),
    })
}

/// Enqueue the caller's selection.
pub async fn move_to_queue(
    state: &SharedState,
    actor: Actor,
    client: &str,
    request: MoveToQueueRequest,
) -> Result<ActionResponse, ServiceError> {
    let decision = Decision {
        confirmed: request.confirm_playing,
        target: request.target.map(Into::into),
    };
    committed(
        command_processor::submit(state, actor, client, Intent::MoveToQueue { decision }).await?,
        "selection queued",
    )
}

/// Take one player out of a waiting queue.
pub async fn remove_from_queue(
    state: &SharedState,
    actor: Actor,
    client: &str,
    queue_index: usize,
    player_id: PlayerId,
    confirm: bool,
) -> Result<ActionResponse, ServiceError> {
    let intent = Intent::RemoveFromQueue {
        player_id,
        queue_index,
        decision: decision(confirm),
    };
    committed(
        command_processor::submit(state, actor, client, intent).await?,
        "player removed from queue",
    )
}

/// Move a full queue onto a court.
pub async fn assign_court(
    state: &SharedState,
    actor: Actor,
    client: &str,
    court_id: CourtId,
    request: AssignCourtRequest,
) -> Result<ActionResponse, ServiceError> {
    let intent = Intent::AssignToCourt {
        court_id,
        queue_index: request.queue_index,
    };
    committed(
        command_processor::submit(state, actor, client, intent).await?,
        format!("court {court_id} assigned"),
    )
}

/// Free a court.
pub async fn clear_court(
    state: &SharedState,
    actor: Actor,
    client: &str,
    court_id: CourtId,
) -> Result<ActionResponse, ServiceError> {
    let intent = Intent::ClearCourt { court_id };
    committed(
        command_processor::submit(state, actor, client, intent).await?,
        format!("court {court_id} cleared"),
    )
}

/// Delete a player from the roster and every queue.
pub async fn remove_player(
    state: &SharedState,
    actor: Actor,
    client: &str,
    player_id: PlayerId,
    confirm: bool,
) -> Result<ActionResponse, ServiceError> {
    let intent = Intent::RemovePlayer {
        player_id,
        decision: decision(confirm),
    };
    committed(
        command_processor::submit(state, actor, client, intent).await?,
        "player removed",
    )
}

/// Wipe the roster, the queues and every court.
pub async fn reset(
    state: &SharedState,
    actor: Actor,
    client: &str,
    request: ResetRequest,
) -> Result<ActionResponse, ServiceError> {
    let intent = Intent::ResetAll {
        decision: decision(request.confirm),
    };
    committed(
        command_processor::submit(state, actor, client, intent).await?,
        "board reset",
    )
}

fn decision(confirm: bool) -> Decision {
    if confirm {
        Decision::confirmed()
    } else {
        Decision::default()
    }
}

fn committed(outcome: Outcome, message: impl Into<String>) -> Result<ActionResponse, ServiceError> {
    match outcome {
        Outcome::Committed => Ok(ActionResponse::new(message)),
        other => Err(unexpected(other)),
    }
}

fn unexpected(outcome: Outcome) -> ServiceError {
    ServiceError::InvalidInput(format!("unexpected outcome {outcome:?}"))
}
