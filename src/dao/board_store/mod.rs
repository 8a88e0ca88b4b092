/// CouchDB backend, one document per collection.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend used by tests and as a fallback.
pub mod memory;

use std::fmt;

use futures::{future::BoxFuture, stream::BoxStream};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::storage::StorageResult;

/// Stream of raw collection snapshots; `None` means nothing is stored yet.
pub type SnapshotStream = BoxStream<'static, StorageResult<Option<Value>>>;

/// The three shared collections making up the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    /// Roster of registered players.
    Players,
    /// Courts and their occupancy.
    Courts,
    /// Waiting queues of player ids.
    WaitingQueues,
}

impl Collection {
    /// Every collection, in the order the board is loaded.
    pub const ALL: [Collection; 3] = [
        Collection::Players,
        Collection::Courts,
        Collection::WaitingQueues,
    ];

    /// Name under which the collection is stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Players => "players",
            Collection::Courts => "courts",
            Collection::WaitingQueues => "waitingQueues",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push-subscribe store holding whole-collection snapshots.
///
/// Writes overwrite the full value of a collection. A subscription yields the
/// current value first, then every later committed value in commit order.
pub trait BoardStore: Send + Sync {
    /// Overwrite the whole value of `collection`.
    fn write(&self, collection: Collection, value: Value) -> BoxFuture<'static, StorageResult<()>>;
    /// Follow `collection`, starting with its current value.
    fn subscribe(&self, collection: Collection) -> BoxFuture<'static, StorageResult<SnapshotStream>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failure.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
