//! Keeps the cached board in step with what the store pushes.

use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::{
    task::JoinHandle,
    time::{sleep, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    dao::{
        board::{BoardRepository, CollectionStream},
        board_store::Collection,
        storage::{StorageError, StorageResult},
    },
    services::sse_events,
    state::{
        SharedState,
        board::CollectionSnapshot,
        echo::{ECHO_GRACE, Reconcile},
    },
};

const RESUBSCRIBE_INITIAL_DELAY: Duration = Duration::from_millis(500);
const RESUBSCRIBE_MAX_DELAY: Duration = Duration::from_secs(10);

/// Load the current value of every collection, then follow each one in its own task.
///
/// Nothing is spawned unless all three initial values arrived, so a store that
/// cannot deliver the board keeps the application degraded.
pub async fn start(
    state: &SharedState,
    repository: &BoardRepository,
) -> StorageResult<Vec<JoinHandle<()>>> {
    let mut streams = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        let mut stream = repository.subscribe(collection).await?;
        let first = stream
            .next()
            .await
            .ok_or(StorageError::SubscriptionClosed {
                collection: collection.as_str(),
            })??;
        load(state, first).await;
        streams.push((collection, stream));
    }
    info!("board loaded from storage");

    Ok(streams
        .into_iter()
        .map(|(collection, stream)| {
            tokio::spawn(follow(
                state.clone(),
                repository.clone(),
                collection,
                stream,
            ))
        })
        .collect())
}

/// Unconditionally install a freshly subscribed value.
async fn load(state: &SharedState, snapshot: CollectionSnapshot) {
    let collection = snapshot.collection();
    let board = {
        let mut cache = state.cache().write().await;
        cache.echoes.reset(collection);
        cache.board.replace(snapshot);
        cache.board.clone()
    };
    if collection == Collection::Players {
        state.prune_selections(&board);
    }
    sse_events::broadcast_collection(state, &board, collection);
}

async fn follow(
    state: SharedState,
    repository: BoardRepository,
    collection: Collection,
    mut stream: CollectionStream,
) {
    loop {
        // last value held back by a pending echo; retried once the grace period passes
        let mut held: Option<CollectionSnapshot> = None;
        loop {
            let item = match held.take() {
                Some(snapshot) => match timeout(ECHO_GRACE, stream.next()).await {
                    Ok(item) => item,
                    Err(_) => {
                        if apply_inbound(&state, snapshot.clone()).await == Reconcile::Hold {
                            held = Some(snapshot);
                        }
                        continue;
                    }
                },
                None => stream.next().await,
            };
            match item {
                Some(Ok(snapshot)) => {
                    if apply_inbound(&state, snapshot.clone()).await == Reconcile::Hold {
                        held = Some(snapshot);
                    }
                }
                Some(Err(err)) => {
                    warn!(%collection, error = %err, "collection subscription failed");
                    break;
                }
                None => {
                    warn!(%collection, "collection subscription ended");
                    break;
                }
            }
        }

        stream = resubscribe(&repository, collection).await;
        // our pending echoes may have been delivered while we were away
        state.cache().write().await.echoes.reset(collection);
        info!(%collection, "collection subscription restored");
    }
}

async fn resubscribe(repository: &BoardRepository, collection: Collection) -> CollectionStream {
    let mut delay = RESUBSCRIBE_INITIAL_DELAY;
    loop {
        sleep(delay).await;
        match repository.subscribe(collection).await {
            Ok(stream) => return stream,
            Err(err) => {
                warn!(%collection, error = %err, "resubscribe attempt failed");
                delay = (delay * 2).min(RESUBSCRIBE_MAX_DELAY);
            }
        }
    }
}

/// Reconcile one pushed snapshot with the cache.
///
/// Values held back by an outstanding echo, and values equal to the cache,
/// are not broadcast.
pub async fn apply_inbound(state: &SharedState, snapshot: CollectionSnapshot) -> Reconcile {
    let collection = snapshot.collection();
    let board = {
        let mut cache = state.cache().write().await;
        if cache.echoes.observe(&snapshot, Instant::now()) == Reconcile::Hold {
            debug!(%collection, "inbound snapshot held behind a pending write");
            return Reconcile::Hold;
        }
        if cache.board.collection(collection) == snapshot {
            return Reconcile::Apply;
        }
        cache.board.replace(snapshot);
        cache.board.clone()
    };

    debug!(%collection, "applied inbound snapshot");
    if collection == Collection::Players {
        state.prune_selections(&board);
    }
    sse_events::broadcast_collection(state, &board, collection);
    Reconcile::Apply
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::board_store::{BoardStore, memory::MemoryBoardStore},
        state::AppState,
    };

    #[tokio::test]
    async fn initial_load_reads_every_collection() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryBoardStore::new();
        store
            .write(
                Collection::Players,
                json!([{"id": 1, "name": "Kim", "grade": "A", "gender": "female", "playCount": 2}]),
            )
            .await
            .unwrap();
        let repository = BoardRepository::new(Arc::new(store.clone()), state.config().layout());

        let tasks = start(&state, &repository).await.unwrap();
        assert_eq!(tasks.len(), 3);

        let board = state.board().await;
        assert_eq!(board.players.len(), 1);
        assert_eq!(board.players[0].play_count, 2);
        assert_eq!(board.courts.len(), 3);
        assert_eq!(board.queues.len(), 3);
        for task in tasks {
            task.abort();
        }
    }

    #[tokio::test]
    async fn identical_snapshots_are_not_rebroadcast() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.public_sse().subscribe();
        let board = state.board().await;

        let outcome = apply_inbound(&state, board.collection(Collection::Courts)).await;

        assert_eq!(outcome, Reconcile::Apply);
        assert!(receiver.try_recv().is_err());
    }
}
