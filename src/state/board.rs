use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::board_store::Collection;

/// Opaque player identifier (creation timestamp in milliseconds).
pub type PlayerId = u64;
/// Court identifier, stable within a venue.
pub type CourtId = u32;

/// Number of players a waiting queue can hold.
pub const QUEUE_CAPACITY: usize = 4;
/// Number of players an occupied court holds.
pub const COURT_CAPACITY: usize = 4;
/// Waiting queue slots that always exist, even when empty.
pub const MIN_QUEUES: usize = 3;
/// Court slots that always exist, even when the store reports fewer.
pub const MIN_COURTS: usize = 3;

/// Skill tier of a registered player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum Grade {
    /// Strongest.
    A,
    /// Strong.
    B,
    /// Average.
    C,
    /// Casual; the registration default.
    #[default]
    D,
    /// Beginner.
    E,
}

impl Grade {
    /// Parse the single-letter wire representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "E" => Some(Self::E),
            _ => None,
        }
    }

    /// Single-letter wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        }
    }
}

/// Display grouping of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Registration default.
    #[default]
    Male,
    /// Female.
    Female,
}

impl Gender {
    /// Parse the lowercase wire representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    /// Lowercase wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// A registered player of the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identifier for the player's lifetime.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Skill tier.
    pub grade: Grade,
    /// Display grouping.
    pub gender: Gender,
    /// Lifetime count of court assignments; never decreases.
    pub play_count: u32,
}

/// A physical court and its current occupancy.
///
/// `players` holds denormalized copies taken at assignment time, so removing a
/// player from the roster does not remove them from a court.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Court {
    /// Court id.
    pub id: CourtId,
    /// Exactly four copies when occupied, empty when free.
    pub players: Vec<Player>,
    /// Milliseconds since the Unix epoch when the occupancy began.
    pub start_time: Option<i64>,
}

impl Court {
    /// A free court with the given identifier.
    pub fn free(id: CourtId) -> Self {
        Self {
            id,
            players: Vec::new(),
            start_time: None,
        }
    }

    /// Whether nobody is playing here.
    pub fn is_free(&self) -> bool {
        self.players.is_empty()
    }

    /// Release the court.
    pub fn clear(&mut self) {
        self.players.clear();
        self.start_time = None;
    }

    /// Whether the given player currently occupies this court.
    pub fn hosts(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|player| player.id == player_id)
    }
}

/// Ordered group of player ids awaiting a court.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingQueue(Vec<PlayerId>);

impl WaitingQueue {
    /// Queue holding `ids` in order.
    pub fn new(ids: Vec<PlayerId>) -> Self {
        Self(ids)
    }

    /// Waiting ids in order.
    pub fn ids(&self) -> &[PlayerId] {
        &self.0
    }

    /// Number of waiting players.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody waits here.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `player_id` waits here.
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.0.contains(&player_id)
    }

    /// Append ids at the back.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = PlayerId>) {
        self.0.extend(ids);
    }

    /// Remove every occurrence of `player_id`, returning whether anything changed.
    pub fn remove(&mut self, player_id: PlayerId) -> bool {
        let before = self.0.len();
        self.0.retain(|id| *id != player_id);
        before != self.0.len()
    }

    /// Keep only the ids matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&PlayerId) -> bool) {
        self.0.retain(keep);
    }

    /// Keep the first `len` ids.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Empty the queue.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// The growable list of waiting queues with a soft minimum of [`MIN_QUEUES`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingQueues(Vec<WaitingQueue>);

impl WaitingQueues {
    /// Wrap queues as stored.
    pub fn new(queues: Vec<WaitingQueue>) -> Self {
        Self(queues)
    }

    /// The canonical list of [`MIN_QUEUES`] empty queues.
    pub fn canonical() -> Self {
        let mut queues = Self::default();
        queues.pad();
        queues
    }

    /// Number of queues.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no queues at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Queue at `index`.
    pub fn get(&self, index: usize) -> Option<&WaitingQueue> {
        self.0.get(index)
    }

    /// Mutable queue at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut WaitingQueue> {
        self.0.get_mut(index)
    }

    /// Queues in order.
    pub fn iter(&self) -> impl Iterator<Item = &WaitingQueue> {
        self.0.iter()
    }

    /// Mutable queues in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WaitingQueue> {
        self.0.iter_mut()
    }

    /// Append a brand-new queue, returning its index.
    pub fn push(&mut self, queue: WaitingQueue) -> usize {
        self.0.push(queue);
        self.0.len() - 1
    }

    /// Index of the first queue holding `player_id`.
    pub fn position_of(&self, player_id: PlayerId) -> Option<usize> {
        self.0.iter().position(|queue| queue.contains(player_id))
    }

    /// Whether any queue holds `player_id`.
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.position_of(player_id).is_some()
    }

    /// Append empty queues until the list holds at least [`MIN_QUEUES`] entries.
    pub fn pad(&mut self) {
        while self.0.len() < MIN_QUEUES {
            self.0.push(WaitingQueue::default());
        }
    }

    /// Drop trailing empty queues beyond the minimum, then pad back up to it.
    ///
    /// Non-empty queues never move, so indices held by callers stay valid.
    pub fn compact(&mut self) {
        while self.0.len() > MIN_QUEUES && self.0.last().is_some_and(WaitingQueue::is_empty) {
            self.0.pop();
        }
        self.pad();
    }

    /// Unwrap the queue list.
    pub fn into_inner(self) -> Vec<WaitingQueue> {
        self.0
    }
}

/// Court layout of a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    min_courts: usize,
}

impl BoardLayout {
    /// Build a layout, never going below [`MIN_COURTS`].
    pub fn new(min_courts: usize) -> Self {
        Self {
            min_courts: min_courts.max(MIN_COURTS),
        }
    }

    /// Courts that always exist.
    pub fn min_courts(&self) -> usize {
        self.min_courts
    }

    /// Free courts numbered `1..=min_courts`.
    pub fn canonical_courts(&self) -> Vec<Court> {
        (1..=self.min_courts as CourtId).map(Court::free).collect()
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::new(MIN_COURTS)
    }
}

/// Where a player currently stands on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStatus {
    /// Court hosting the player, if any.
    pub court: Option<CourtId>,
    /// Queue holding the player, if any.
    pub queue: Option<usize>,
}

/// Full shared state: roster, courts, and waiting queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Registered players.
    pub players: Vec<Player>,
    /// Every court.
    pub courts: Vec<Court>,
    /// Waiting queues.
    pub queues: WaitingQueues,
}

impl Board {
    /// Empty roster, free canonical courts, and the minimum number of empty queues.
    pub fn canonical(layout: BoardLayout) -> Self {
        Self {
            players: Vec::new(),
            courts: layout.canonical_courts(),
            queues: WaitingQueues::canonical(),
        }
    }

    /// Roster entry with `id`.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Court with `id`.
    pub fn court(&self, id: CourtId) -> Option<&Court> {
        self.courts.iter().find(|court| court.id == id)
    }

    /// Ids of every player currently occupying a court.
    pub fn playing_ids(&self) -> HashSet<PlayerId> {
        self.courts
            .iter()
            .flat_map(|court| court.players.iter().map(|player| player.id))
            .collect()
    }

    /// Court and queue currently holding `id`.
    pub fn status_of(&self, id: PlayerId) -> PlayerStatus {
        PlayerStatus {
            court: self
                .courts
                .iter()
                .find(|court| court.hosts(id))
                .map(|court| court.id),
            queue: self.queues.position_of(id),
        }
    }

    /// Display names for `ids`, falling back to court copies and then to the raw id.
    pub fn names_of(&self, ids: &[PlayerId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.player(*id)
                    .or_else(|| {
                        self.courts
                            .iter()
                            .flat_map(|court| court.players.iter())
                            .find(|player| player.id == *id)
                    })
                    .map(|player| player.name.clone())
                    .unwrap_or_else(|| format!("#{id}"))
            })
            .collect()
    }

    /// Generate an id not used by any roster entry, preferring `now_ms`.
    ///
    /// When `now_ms` is taken the id follows the highest roster id; if that
    /// one is `u64::MAX`, the smallest unused id is handed out instead.
    pub fn fresh_player_id(&self, now_ms: i64) -> PlayerId {
        let candidate = u64::try_from(now_ms).unwrap_or_default();
        let highest = self.players.iter().map(|player| player.id).max();
        match highest {
            Some(max) if max >= candidate => max
                .checked_add(1)
                .unwrap_or_else(|| self.lowest_unused_player_id()),
            _ => candidate,
        }
    }

    fn lowest_unused_player_id(&self) -> PlayerId {
        let taken: HashSet<PlayerId> = self.players.iter().map(|player| player.id).collect();
        (0..).find(|id| !taken.contains(id)).unwrap_or_default()
    }

    /// Clone out one collection of the board.
    pub fn collection(&self, collection: Collection) -> CollectionSnapshot {
        match collection {
            Collection::Players => CollectionSnapshot::Players(self.players.clone()),
            Collection::Courts => CollectionSnapshot::Courts(self.courts.clone()),
            Collection::WaitingQueues => CollectionSnapshot::WaitingQueues(self.queues.clone()),
        }
    }

    /// Replace one collection with the given snapshot.
    pub fn replace(&mut self, snapshot: CollectionSnapshot) {
        match snapshot {
            CollectionSnapshot::Players(players) => self.players = players,
            CollectionSnapshot::Courts(courts) => self.courts = courts,
            CollectionSnapshot::WaitingQueues(queues) => self.queues = queues,
        }
    }
}

/// Full value of one persisted collection at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSnapshot {
    /// Roster value.
    Players(Vec<Player>),
    /// Court list value.
    Courts(Vec<Court>),
    /// Waiting queues value.
    WaitingQueues(WaitingQueues),
}

impl CollectionSnapshot {
    /// Collection this snapshot belongs to.
    pub fn collection(&self) -> Collection {
        match self {
            Self::Players(_) => Collection::Players,
            Self::Courts(_) => Collection::Courts,
            Self::WaitingQueues(_) => Collection::WaitingQueues,
        }
    }
}
