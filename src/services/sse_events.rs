use serde::Serialize;
use tracing::warn;

use crate::{
    dao::board_store::Collection,
    dto::{
        board::{BoardView, court_views, player_views, queue_views},
        sse::{
            CourtClock, CourtClockEvent, CourtsChangedEvent, PlayersChangedEvent,
            QueuesChangedEvent, ServerEvent, SystemStatus,
        },
    },
    state::{SharedState, board::Board, clock},
};

/// Roster changed.
pub const EVENT_PLAYERS: &str = "board.players";
/// Court occupancy changed.
pub const EVENT_COURTS: &str = "board.courts";
/// Waiting queues changed.
pub const EVENT_QUEUES: &str = "board.queues";
/// Whole board, sent first on every stream.
pub const EVENT_SNAPSHOT: &str = "board.snapshot";
/// Per-court elapsed time tick.
pub const EVENT_COURT_CLOCK: &str = "courts.clock";
/// Degraded mode entered or left.
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the part of `board` that changed.
///
/// Queue and court views embed player names, so a roster change also
/// refreshes the queues.
pub fn broadcast_collection(state: &SharedState, board: &Board, collection: Collection) {
    match collection {
        Collection::Players => {
            let payload = PlayersChangedEvent {
                players: player_views(board),
            };
            send_public_event(state, EVENT_PLAYERS, &payload);
            broadcast_queues(state, board);
        }
        Collection::Courts => {
            let payload = CourtsChangedEvent {
                courts: court_views(board, clock::now_ms()),
            };
            send_public_event(state, EVENT_COURTS, &payload);
            // player statuses depend on court occupancy
            let payload = PlayersChangedEvent {
                players: player_views(board),
            };
            send_public_event(state, EVENT_PLAYERS, &payload);
        }
        Collection::WaitingQueues => {
            broadcast_queues(state, board);
            let payload = PlayersChangedEvent {
                players: player_views(board),
            };
            send_public_event(state, EVENT_PLAYERS, &payload);
        }
    }
}

fn broadcast_queues(state: &SharedState, board: &Board) {
    let payload = QueuesChangedEvent {
        queues: queue_views(board),
    };
    send_public_event(state, EVENT_QUEUES, &payload);
}

/// Build the snapshot event sent to a stream right after it connects.
pub fn snapshot_event(board: &Board) -> Option<ServerEvent> {
    let view = BoardView::build(board, clock::now_ms());
    match ServerEvent::json(Some(EVENT_SNAPSHOT.to_string()), &view) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize board snapshot");
            None
        }
    }
}

/// Broadcast every court's elapsed time.
pub fn broadcast_court_clock(state: &SharedState, board: &Board, now_ms: i64) {
    let payload = CourtClockEvent {
        courts: board
            .courts
            .iter()
            .map(|court| CourtClock {
                court_id: court.id,
                elapsed: clock::elapsed(court.start_time, now_ms),
            })
            .collect(),
    };
    send_public_event(state, EVENT_COURT_CLOCK, &payload);
}

/// Broadcast whether the backend currently runs without storage.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn court_changes_refresh_player_statuses() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.public_sse().subscribe();
        let board = state.board().await;

        broadcast_collection(&state, &board, Collection::Courts);

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(EVENT_COURTS));
        assert_eq!(second.event.as_deref(), Some(EVENT_PLAYERS));
    }

    #[tokio::test]
    async fn clock_tick_lists_every_court() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.public_sse().subscribe();
        let mut board = state.board().await;
        board.courts[2].start_time = Some(0);

        broadcast_court_clock(&state, &board, 61_000);

        let event = receiver.recv().await.unwrap();
        let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(payload["courts"].as_array().unwrap().len(), 3);
        assert_eq!(payload["courts"][2]["elapsed"], "01:01");
        assert_eq!(payload["courts"][0]["elapsed"], "00:00");
    }
}
