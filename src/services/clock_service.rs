//! Periodic court clock and degraded-mode relay for the public stream.

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{info, warn};

use crate::{
    services::sse_events,
    state::{SharedState, clock},
};

/// Broadcast every court's elapsed time once per tick while someone is listening.
pub fn spawn_ticker(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(state.config().tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if !state.public_sse().has_subscribers() {
                continue;
            }
            let board = state.board().await;
            sse_events::broadcast_court_clock(&state, &board, clock::now_ms());
        }
    })
}

/// Forward degraded-mode transitions to the public stream.
pub fn spawn_status_relay(state: SharedState) -> JoinHandle<()> {
    let mut watcher = state.degraded_watcher();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let degraded = *watcher.borrow_and_update();
            if degraded {
                warn!("board storage lost; intents are rejected until it returns");
            } else {
                info!("board storage available");
            }
            sse_events::broadcast_system_status(&state, degraded);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn degraded_transitions_reach_the_public_stream() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.public_sse().subscribe();
        let relay = spawn_status_relay(state.clone());

        state.update_degraded(false).await;

        let event = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event.as_deref(), Some(sse_events::EVENT_SYSTEM_STATUS));
        assert_eq!(event.data, r#"{"degraded":false}"#);
        relay.abort();
    }
}
