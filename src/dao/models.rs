//! Wire representation of the three persisted collections.
//!
//! Field names follow the shape existing clients already read from the store
//! (`playCount`, `startTime`), so the entities are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::board::{Court, CourtId, Player, PlayerId, WaitingQueues};

/// Player record as stored in the `players` collection and copied onto courts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntity {
    /// Stable identifier (creation timestamp in milliseconds).
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Skill tier letter (`A`..`E`).
    pub grade: String,
    /// `male` or `female`.
    pub gender: String,
    /// Lifetime number of court assignments.
    pub play_count: u32,
}

/// Court record as stored in the `courts` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourtEntity {
    /// Court identifier.
    pub id: CourtId,
    /// Denormalized copies of the occupying players.
    pub players: Vec<PlayerEntity>,
    /// Occupancy start in milliseconds since the Unix epoch.
    pub start_time: Option<i64>,
}

/// A waiting queue is stored as a bare list of player ids.
pub type QueueEntity = Vec<PlayerId>;

impl From<&Player> for PlayerEntity {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            grade: value.grade.as_str().to_string(),
            gender: value.gender.as_str().to_string(),
            play_count: value.play_count,
        }
    }
}

impl From<&Court> for CourtEntity {
    fn from(value: &Court) -> Self {
        Self {
            id: value.id,
            players: value.players.iter().map(Into::into).collect(),
            start_time: value.start_time,
        }
    }
}

/// Encode the roster for storage.
pub fn players_to_value(players: &[Player]) -> serde_json::Result<Value> {
    let entities: Vec<PlayerEntity> = players.iter().map(Into::into).collect();
    serde_json::to_value(entities)
}

/// Encode the court list for storage.
pub fn courts_to_value(courts: &[Court]) -> serde_json::Result<Value> {
    let entities: Vec<CourtEntity> = courts.iter().map(Into::into).collect();
    serde_json::to_value(entities)
}

/// Encode the waiting queues for storage.
pub fn queues_to_value(queues: &WaitingQueues) -> serde_json::Result<Value> {
    let entities: Vec<QueueEntity> = queues.iter().map(|queue| queue.ids().to_vec()).collect();
    serde_json::to_value(entities)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::board::{Gender, Grade, WaitingQueue};

    #[test]
    fn entities_use_the_shared_wire_shape() {
        let kim = Player {
            id: 1_700_000_000_000,
            name: "Kim".into(),
            grade: Grade::B,
            gender: Gender::Female,
            play_count: 2,
        };
        let court = Court {
            id: 2,
            players: vec![kim.clone()],
            start_time: Some(1_700_000_100_000),
        };

        assert_eq!(
            players_to_value(std::slice::from_ref(&kim)).unwrap(),
            json!([{"id": 1_700_000_000_000u64, "name": "Kim", "grade": "B", "gender": "female", "playCount": 2}])
        );
        assert_eq!(
            courts_to_value(&[court]).unwrap()[0]["startTime"],
            json!(1_700_000_100_000i64)
        );
        assert_eq!(
            queues_to_value(&WaitingQueues::new(vec![WaitingQueue::new(vec![1, 2]), WaitingQueue::default()])).unwrap(),
            json!([[1, 2], []])
        );
    }
}
