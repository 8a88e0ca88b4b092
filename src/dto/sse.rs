use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::board::{CourtView, PlayerView, QueueView},
    state::board::CourtId,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// Event name, if any.
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether storage is unavailable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after the roster changed.
pub struct PlayersChangedEvent {
    /// Roster with positions.
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after court occupancy changed.
pub struct CourtsChangedEvent {
    /// Every court.
    pub courts: Vec<CourtView>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after the waiting queues changed.
pub struct QueuesChangedEvent {
    /// Every waiting queue.
    pub queues: Vec<QueueView>,
}

/// Elapsed time of one court.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourtClock {
    /// Court id.
    pub court_id: CourtId,
    /// `MM:SS` since the occupancy started; `00:00` for free courts.
    pub elapsed: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Periodic tick carrying every court's elapsed time.
pub struct CourtClockEvent {
    /// Every court's clock.
    pub courts: Vec<CourtClock>,
}
