//! Single writer for the board.
//!
//! Every mutating intent goes through one task that reads the cached board,
//! runs the engine and writes the resulting collections in order. Only one
//! command is in flight at any time, so two operators can no longer race each
//! other's read-modify-write cycles inside this process.

use std::time::Instant;

use tokio::{sync::oneshot, task::JoinHandle, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        board::{CourtId, Gender, Grade, Player, PlayerId},
        capability::Actor,
        clock::now_ms,
        engine::{Decision, Mutation},
        selection::SelectionSet,
    },
};

/// Something a client asked the board to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Select or deselect a player.
    ToggleSelection {
        /// Player to flip.
        player_id: PlayerId,
    },
    /// Empty the caller's selection.
    ClearSelection,
    /// Queue the caller's selection.
    MoveToQueue {
        /// Prompt answers.
        decision: Decision,
    },
    /// Take a player out of one queue.
    RemoveFromQueue {
        /// Player to remove.
        player_id: PlayerId,
        /// Queue to remove from.
        queue_index: usize,
        /// Prompt answers.
        decision: Decision,
    },
    /// Move a full queue onto a court.
    AssignToCourt {
        /// Target court.
        court_id: CourtId,
        /// Source queue.
        queue_index: usize,
    },
    /// Free a court.
    ClearCourt {
        /// Court to free.
        court_id: CourtId,
    },
    /// Delete a player from the roster.
    RemovePlayer {
        /// Player to delete.
        player_id: PlayerId,
        /// Prompt answers.
        decision: Decision,
    },
    /// Register a player.
    AddPlayer {
        /// Display name.
        name: String,
        /// Skill tier.
        grade: Grade,
        /// Display grouping.
        gender: Gender,
    },
    /// Wipe the board.
    ResetAll {
        /// Prompt answers.
        decision: Decision,
    },
}

impl Intent {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::ToggleSelection { .. } => "toggle_selection",
            Intent::ClearSelection => "clear_selection",
            Intent::MoveToQueue { .. } => "move_to_queue",
            Intent::RemoveFromQueue { .. } => "remove_from_queue",
            Intent::AssignToCourt { .. } => "assign_to_court",
            Intent::ClearCourt { .. } => "clear_court",
            Intent::RemovePlayer { .. } => "remove_player",
            Intent::AddPlayer { .. } => "add_player",
            Intent::ResetAll { .. } => "reset_all",
        }
    }

    /// Registration is the only intent open to anonymous callers.
    pub fn is_privileged(&self) -> bool {
        !matches!(self, Intent::AddPlayer { .. })
    }
}

/// Result of an accepted intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The caller's selection after a selection intent.
    Selection {
        /// Current selection.
        selection: SelectionSet,
        /// Set on toggles.
        selected: Option<bool>,
    },
    /// Every write landed.
    Committed,
    /// The registered player.
    PlayerAdded(Player),
}

/// An intent queued for the processor along with the channel for its answer.
pub struct Command {
    /// Who is asking.
    pub actor: Actor,
    /// Selection key of the caller.
    pub client: String,
    /// What to do.
    pub intent: Intent,
    /// Where the answer goes.
    pub reply: oneshot::Sender<Result<Outcome, ServiceError>>,
}

/// Start the processor. Returns `None` if it is already running.
pub async fn spawn(state: SharedState) -> Option<JoinHandle<()>> {
    let mut receiver = state.take_command_receiver().await?;
    Some(tokio::spawn(async move {
        while let Some(command) = receiver.recv().await {
            let Command {
                actor,
                client,
                intent,
                reply,
            } = command;
            let result = handle(&state, actor, &client, intent).await;
            let _ = reply.send(result);
        }
        debug!("command channel closed; processor stopping");
    }))
}

/// Queue an intent and wait for the processor's answer.
pub async fn submit(
    state: &SharedState,
    actor: Actor,
    client: &str,
    intent: Intent,
) -> Result<Outcome, ServiceError> {
    let (reply, answer) = oneshot::channel();
    state
        .commands()
        .send(Command {
            actor,
            client: client.to_string(),
            intent,
            reply,
        })
        .await
        .map_err(|_| ServiceError::Closed)?;
    answer.await.map_err(|_| ServiceError::Closed)?
}

async fn handle(
    state: &SharedState,
    actor: Actor,
    client: &str,
    intent: Intent,
) -> Result<Outcome, ServiceError> {
    let name = intent.name();
    if intent.is_privileged() && !actor.is_admin() {
        debug!(intent = name, "rejected privileged intent from public caller");
        return Err(ServiceError::Unauthorized(
            "admin key required for this action".into(),
        ));
    }

    let result = execute(state, client, intent).await;
    match &result {
        Ok(Outcome::Committed | Outcome::PlayerAdded(_)) => {
            info!(intent = name, client, "intent committed")
        }
        Ok(Outcome::Selection { .. }) => debug!(intent = name, client, "selection updated"),
        Err(err) => debug!(intent = name, client, error = %err, "intent not applied"),
    }
    result
}

async fn execute(
    state: &SharedState,
    client: &str,
    intent: Intent,
) -> Result<Outcome, ServiceError> {
    let engine = state.engine();
    let board = state.board().await;

    match intent {
        Intent::ToggleSelection { player_id } => {
            let mut selection = state.selection(client);
            let selected = engine.toggle_selection(&board, &mut selection, player_id)?;
            state.store_selection(client, selection.clone());
            Ok(Outcome::Selection {
                selection,
                selected: Some(selected),
            })
        }
        Intent::ClearSelection => {
            state.store_selection(client, SelectionSet::new());
            Ok(Outcome::Selection {
                selection: SelectionSet::new(),
                selected: None,
            })
        }
        Intent::MoveToQueue { decision } => {
            let selection = state.selection(client);
            let mutation = engine.move_to_queue(&board, &selection, decision)?;
            commit(state, mutation).await?;
            state.store_selection(client, SelectionSet::new());
            Ok(Outcome::Committed)
        }
        Intent::RemoveFromQueue {
            player_id,
            queue_index,
            decision,
        } => {
            let mutation = engine.remove_from_queue(&board, player_id, queue_index, decision)?;
            commit(state, mutation).await?;
            Ok(Outcome::Committed)
        }
        Intent::AssignToCourt {
            court_id,
            queue_index,
        } => {
            let now = now_ms();
            let mutation = engine.assign_to_court(&board, court_id, queue_index, now)?;
            commit(state, mutation).await?;
            Ok(Outcome::Committed)
        }
        Intent::ClearCourt { court_id } => {
            let mutation = engine.clear_court(&board, court_id)?;
            commit(state, mutation).await?;
            Ok(Outcome::Committed)
        }
        Intent::RemovePlayer {
            player_id,
            decision,
        } => {
            let mutation = engine.remove_player(&board, player_id, decision)?;
            commit(state, mutation).await?;
            state.forget_selected(player_id);
            Ok(Outcome::Committed)
        }
        Intent::AddPlayer {
            name,
            grade,
            gender,
        } => {
            let now = now_ms();
            let (mutation, player) = engine.add_player(&board, &name, grade, gender, now)?;
            commit(state, mutation).await?;
            Ok(Outcome::PlayerAdded(player))
        }
        Intent::ResetAll { decision } => {
            let mutation = engine.reset_all(decision)?;
            commit(state, mutation).await?;
            state.clear_selections();
            Ok(Outcome::Committed)
        }
    }
}

/// Write each collection of `mutation` in order, stopping at the first failure.
///
/// Collections written before a failure stay committed; there is no rollback
/// across collections.
pub async fn commit(state: &SharedState, mutation: Mutation) -> Result<(), ServiceError> {
    let repository = state.require_repository().await?;
    let limit = state.config().write_timeout();

    for snapshot in mutation.into_writes() {
        let snapshot = repository.repair(snapshot);
        let collection = snapshot.collection();
        let ticket = state.cache().write().await.echoes.expect(snapshot.clone());

        let outcome = timeout(limit, repository.save(&snapshot)).await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                warn!(collection = %collection, error = %err, "collection write failed");
                Some(ServiceError::from(err))
            }
            Err(_) => {
                warn!(
                    collection = %collection,
                    timeout_ms = limit.as_millis() as u64,
                    "collection write timed out"
                );
                Some(ServiceError::Timeout)
            }
        };

        let mut cache = state.cache().write().await;
        if let Some(err) = failure {
            cache.echoes.forget(ticket);
            return Err(err);
        }
        if cache.echoes.settle(ticket, Instant::now()) {
            cache.board.replace(snapshot);
            let board = cache.board.clone();
            drop(cache);
            sse_events::broadcast_collection(state, &board, collection);
        }
    }

    Ok(())
}
