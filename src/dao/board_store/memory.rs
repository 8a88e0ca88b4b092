//! Process-local store used when no external database is configured.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::{StreamExt, future::BoxFuture};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::dao::{
    board_store::{BoardStore, Collection, SnapshotStream},
    storage::{StorageError, StorageResult},
};

/// Raised while the store is switched offline.
#[derive(Debug, Error)]
#[error("in-memory store is offline")]
pub struct MemoryStoreOffline;

/// Keeps one watch channel per collection.
///
/// Subscribers see the latest value; intermediate values may be coalesced when
/// a subscriber lags, but the final committed value is always delivered.
#[derive(Clone)]
pub struct MemoryBoardStore {
    players: Arc<watch::Sender<Option<Value>>>,
    courts: Arc<watch::Sender<Option<Value>>>,
    queues: Arc<watch::Sender<Option<Value>>>,
    online: Arc<AtomicBool>,
}

impl MemoryBoardStore {
    /// Empty store; every collection starts absent.
    pub fn new() -> Self {
        Self {
            players: Arc::new(watch::Sender::new(None)),
            courts: Arc::new(watch::Sender::new(None)),
            queues: Arc::new(watch::Sender::new(None)),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    fn channel(&self, collection: Collection) -> &watch::Sender<Option<Value>> {
        match collection {
            Collection::Players => &self.players,
            Collection::Courts => &self.courts,
            Collection::WaitingQueues => &self.queues,
        }
    }

    /// Current raw value of a collection.
    pub fn current(&self, collection: Collection) -> Option<Value> {
        self.channel(collection).borrow().clone()
    }

    /// Simulate an outage: writes and health checks fail until set back online.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable(
                MemoryStoreOffline.to_string(),
                MemoryStoreOffline,
            ))
        }
    }
}

impl Default for MemoryBoardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardStore for MemoryBoardStore {
    fn write(&self, collection: Collection, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store.channel(collection).send_replace(Some(value));
            Ok(())
        })
    }

    fn subscribe(&self, collection: Collection) -> BoxFuture<'static, StorageResult<SnapshotStream>> {
        let receiver = self.channel(collection).subscribe();
        Box::pin(async move { Ok(WatchStream::new(receiver).map(Ok).boxed()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.health_check()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn subscription_starts_with_the_current_value() {
        let store = MemoryBoardStore::new();
        let mut players = store.subscribe(Collection::Players).await.unwrap();
        assert_eq!(players.next().await.unwrap().unwrap(), None);

        store
            .write(Collection::Players, json!([{"id": 1}]))
            .await
            .unwrap();
        assert_eq!(
            players.next().await.unwrap().unwrap(),
            Some(json!([{"id": 1}]))
        );

        let mut late = store.subscribe(Collection::Players).await.unwrap();
        assert_eq!(late.next().await.unwrap().unwrap(), Some(json!([{"id": 1}])));
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = MemoryBoardStore::new();
        store.write(Collection::Courts, json!([])).await.unwrap();
        assert_eq!(store.current(Collection::Courts), Some(json!([])));
        assert_eq!(store.current(Collection::WaitingQueues), None);
    }

    #[tokio::test]
    async fn offline_store_rejects_writes() {
        let store = MemoryBoardStore::new();
        store.set_online(false);
        assert!(store.write(Collection::Players, json!([])).await.is_err());
        assert!(store.health_check().await.is_err());
        assert_eq!(store.current(Collection::Players), None);

        store.set_online(true);
        assert!(store.try_reconnect().await.is_ok());
    }
}
