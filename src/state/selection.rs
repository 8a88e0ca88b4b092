use indexmap::IndexSet;
use thiserror::Error;

use crate::state::board::PlayerId;

/// Maximum number of players that can be selected at once.
pub const SELECTION_CAPACITY: usize = 4;

/// Raised when a fifth player is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("selection already holds {} players", SELECTION_CAPACITY)]
pub struct SelectionFull;

/// Players a privileged client is preparing to enqueue together, in pick order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(IndexSet<PlayerId>);

impl SelectionSet {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected ids in selection order.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.0.iter().copied().collect()
    }

    /// Number of selected players.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `player_id` is selected.
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.0.contains(&player_id)
    }

    /// Add a player, refusing a fifth member. Returns `false` if already present.
    pub fn insert(&mut self, player_id: PlayerId) -> Result<bool, SelectionFull> {
        if self.0.contains(&player_id) {
            return Ok(false);
        }
        if self.0.len() >= SELECTION_CAPACITY {
            return Err(SelectionFull);
        }
        Ok(self.0.insert(player_id))
    }

    /// Deselect `player_id`, returning whether it was selected.
    pub fn remove(&mut self, player_id: PlayerId) -> bool {
        self.0.shift_remove(&player_id)
    }

    /// Deselect everyone.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}
