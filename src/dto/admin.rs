//! DTO definitions used by the privileged REST API and documentation layer.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::state::{
    board::PlayerId,
    engine::{QueueChoice, QueueOption},
};

/// Where a one- or two-player selection should be queued.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueTargetInput {
    /// Append to the queue at `index`.
    Existing {
        /// Zero-based queue index.
        index: usize,
    },
    /// Create a new queue.
    New,
}

impl From<QueueTargetInput> for QueueChoice {
    fn from(value: QueueTargetInput) -> Self {
        match value {
            QueueTargetInput::Existing { index } => QueueChoice::Existing(index),
            QueueTargetInput::New => QueueChoice::New,
        }
    }
}

/// Enqueue the caller's current selection.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MoveToQueueRequest {
    /// Proceed even though some selected players are on a court.
    #[serde(default)]
    pub confirm_playing: bool,
    /// Required for selections of one or two players.
    #[serde(default)]
    pub target: Option<QueueTargetInput>,
}

/// `?confirm=true` answers the confirmation prompt of destructive intents.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfirmQuery {
    /// Answer to the prompt.
    #[serde(default)]
    pub confirm: bool,
}

/// Move a full queue onto a court.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignCourtRequest {
    /// Zero-based index of a queue holding four players.
    pub queue_index: usize,
}

/// Wipe the board.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResetRequest {
    /// Must be `true` to proceed.
    #[serde(default)]
    pub confirm: bool,
}

/// A client's pending selection.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SelectionResponse {
    /// Selection key of the caller.
    pub client: String,
    /// Selected ids in selection order.
    pub players: Vec<PlayerId>,
    /// Display names of the selected players.
    pub names: Vec<String>,
    /// Largest selection allowed.
    pub capacity: usize,
    /// Set on toggles: whether the toggled player is now selected.
    pub selected: Option<bool>,
}

/// Where the current selection could go.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueTargetsResponse {
    /// Players currently selected.
    pub selection_size: usize,
    /// Three or four players always get a new queue.
    pub new_queue_only: bool,
    /// Existing queues with room for the selection.
    pub options: Vec<QueueOption>,
    /// Index a new queue would get.
    pub new_queue_index: usize,
    /// Selected players currently on a court.
    pub playing: Vec<String>,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// What happened.
    pub message: String,
}

impl ActionResponse {
    /// Acknowledge with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_targets_are_tagged() {
        let request: MoveToQueueRequest =
            serde_json::from_str(r#"{"target": {"kind": "existing", "index": 2}}"#).unwrap();
        assert!(!request.confirm_playing);
        assert_eq!(
            request.target.map(QueueChoice::from),
            Some(QueueChoice::Existing(2))
        );

        let request: MoveToQueueRequest =
            serde_json::from_str(r#"{"confirm_playing": true, "target": {"kind": "new"}}"#)
                .unwrap();
        assert!(request.confirm_playing);
        assert_eq!(request.target.map(QueueChoice::from), Some(QueueChoice::New));
    }
}
