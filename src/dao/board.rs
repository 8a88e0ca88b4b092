//! Typed access to the board collections on top of a raw [`BoardStore`].

use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};
use serde_json::Value;

use crate::{
    dao::{
        board_store::{BoardStore, Collection},
        models::{courts_to_value, players_to_value, queues_to_value},
        storage::{StorageError, StorageResult},
    },
    state::{
        board::{BoardLayout, CollectionSnapshot, Court, Player, WaitingQueues},
        normalize,
    },
};

/// Stream of normalized snapshots for one collection.
pub type CollectionStream = BoxStream<'static, StorageResult<CollectionSnapshot>>;

/// Normalizes every inbound value and repairs every outbound one.
#[derive(Clone)]
pub struct BoardRepository {
    store: Arc<dyn BoardStore>,
    layout: BoardLayout,
}

impl BoardRepository {
    /// Wrap a store for the given venue layout.
    pub fn new(store: Arc<dyn BoardStore>, layout: BoardLayout) -> Self {
        Self { store, layout }
    }

    /// Layout used to pad courts on decode.
    pub fn layout(&self) -> BoardLayout {
        self.layout
    }

    /// Interpret a raw snapshot of `collection`.
    pub fn decode(&self, collection: Collection, value: Option<&Value>) -> CollectionSnapshot {
        match collection {
            Collection::Players => CollectionSnapshot::Players(normalize::players(value)),
            Collection::Courts => CollectionSnapshot::Courts(normalize::courts(value, self.layout)),
            Collection::WaitingQueues => {
                CollectionSnapshot::WaitingQueues(normalize::waiting_queues(value))
            }
        }
    }

    /// Apply the collection invariants to an outbound snapshot.
    pub fn repair(&self, snapshot: CollectionSnapshot) -> CollectionSnapshot {
        match snapshot {
            CollectionSnapshot::Players(players) => {
                CollectionSnapshot::Players(normalize::repair_players(players))
            }
            CollectionSnapshot::Courts(courts) => {
                CollectionSnapshot::Courts(normalize::repair_courts(courts, self.layout))
            }
            CollectionSnapshot::WaitingQueues(queues) => {
                CollectionSnapshot::WaitingQueues(normalize::repair_queues(queues))
            }
        }
    }

    fn encode(snapshot: &CollectionSnapshot) -> StorageResult<Value> {
        let collection = snapshot.collection();
        let encoded = match snapshot {
            CollectionSnapshot::Players(players) => players_to_value(players),
            CollectionSnapshot::Courts(courts) => courts_to_value(courts),
            CollectionSnapshot::WaitingQueues(queues) => queues_to_value(queues),
        };
        encoded.map_err(|source| StorageError::Encode {
            collection: collection.as_str(),
            source,
        })
    }

    /// Overwrite one collection with a repaired copy of `snapshot`.
    pub async fn save(&self, snapshot: &CollectionSnapshot) -> StorageResult<()> {
        let repaired = self.repair(snapshot.clone());
        let value = Self::encode(&repaired)?;
        self.store.write(repaired.collection(), value).await
    }

    /// Overwrite the roster.
    pub async fn save_players(&self, players: Vec<Player>) -> StorageResult<()> {
        self.save(&CollectionSnapshot::Players(players)).await
    }

    /// Overwrite the court list.
    pub async fn save_courts(&self, courts: Vec<Court>) -> StorageResult<()> {
        self.save(&CollectionSnapshot::Courts(courts)).await
    }

    /// Overwrite the waiting queues.
    pub async fn save_queues(&self, queues: WaitingQueues) -> StorageResult<()> {
        self.save(&CollectionSnapshot::WaitingQueues(queues)).await
    }

    /// Follow one collection, yielding normalized snapshots.
    pub async fn subscribe(&self, collection: Collection) -> StorageResult<CollectionStream> {
        let raw = self.store.subscribe(collection).await?;
        let repository = self.clone();
        Ok(raw
            .map(move |item| item.map(|value| repository.decode(collection, value.as_ref())))
            .boxed())
    }

    /// Probe the backing store.
    pub async fn health_check(&self) -> StorageResult<()> {
        self.store.health_check().await
    }

    /// Ask the backing store to re-establish its connection.
    pub async fn try_reconnect(&self) -> StorageResult<()> {
        self.store.try_reconnect().await
    }
}
