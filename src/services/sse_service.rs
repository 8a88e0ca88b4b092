use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::ServerEvent,
    services::sse_events,
    state::SharedState,
};

/// Subscribe to the public stream and queue the current board as its first event.
pub async fn subscribe_public(
    state: &SharedState,
) -> (Option<ServerEvent>, broadcast::Receiver<ServerEvent>) {
    // subscribe before reading the board so no change slips in between
    let receiver = state.public_sse().subscribe();
    let snapshot = sse_events::snapshot_event(&state.board().await);
    (snapshot, receiver)
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, forwarding events until
/// the client disconnects.
pub fn to_sse_stream(
    initial: Option<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(initial) = initial
            && tx.send(Ok(to_event(initial))).await.is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Later collection events carry full snapshots.
                            tracing::debug!(skipped, "public SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!("Public SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::state::AppState;

    #[tokio::test]
    async fn new_subscribers_start_with_a_snapshot() {
        let state = AppState::new(AppConfig::default());
        let (snapshot, _receiver) = subscribe_public(&state).await;
        let snapshot = snapshot.unwrap();

        assert_eq!(snapshot.event.as_deref(), Some(sse_events::EVENT_SNAPSHOT));
        let payload: serde_json::Value = serde_json::from_str(&snapshot.data).unwrap();
        assert_eq!(payload["courts"].as_array().unwrap().len(), 3);
        assert!(state.public_sse().has_subscribers());
    }
}
