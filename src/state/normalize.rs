//! Single validation boundary for inbound snapshots.
//!
//! Every value pushed by the store goes through these functions before the
//! engine or any view observes it. They never fail: anything that cannot be
//! interpreted collapses to the canonical default for its collection. All
//! functions are pure and idempotent, so `repair` can also run defensively
//! before every outbound write.

use std::collections::HashSet;

use serde_json::Value;

use crate::state::board::{
    Board, BoardLayout, COURT_CAPACITY, Court, CourtId, Gender, Grade, Player, PlayerId,
    QUEUE_CAPACITY, WaitingQueue, WaitingQueues,
};

/// Container shape of a raw snapshot as pushed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotShape {
    /// No value stored (or explicit null).
    Absent,
    /// A JSON array.
    Sequence,
    /// A JSON object whose values are taken in stored order.
    Mapping,
    /// Anything else; falls back to the canonical default.
    Malformed,
}

/// Classify a raw snapshot before normalizing it.
pub fn shape(value: Option<&Value>) -> SnapshotShape {
    match value {
        None | Some(Value::Null) => SnapshotShape::Absent,
        Some(Value::Array(_)) => SnapshotShape::Sequence,
        Some(Value::Object(_)) => SnapshotShape::Mapping,
        Some(_) => SnapshotShape::Malformed,
    }
}

/// View a container as a sequence, taking object values in stored order.
fn entries(value: Option<&Value>) -> Option<Vec<&Value>> {
    match value? {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(map) => Some(map.values().collect()),
        _ => None,
    }
}

/// Firebase-style truthiness used to drop holes in sparse arrays.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read a non-negative integral number.
fn as_whole_number(value: &Value) -> Option<u64> {
    if let Some(number) = value.as_u64() {
        return Some(number);
    }
    let float = value.as_f64()?;
    (float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64)
        .then_some(float as u64)
}

fn as_timestamp(value: &Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    let float = value.as_f64()?;
    float.is_finite().then_some(float.trunc() as i64)
}

/// Decode one player record, supplying defaults for missing fields.
///
/// Records without a numeric id cannot be referenced by queues and are dropped.
fn player_from_value(value: &Value) -> Option<Player> {
    let record = value.as_object()?;
    let id = record.get("id").and_then(as_whole_number)?;
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let grade = record
        .get("grade")
        .and_then(Value::as_str)
        .and_then(Grade::parse)
        .unwrap_or_default();
    let gender = record
        .get("gender")
        .and_then(Value::as_str)
        .and_then(Gender::parse)
        .unwrap_or_default();
    let play_count = record
        .get("playCount")
        .and_then(|count| {
            as_whole_number(count)
                .or_else(|| count.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
        })
        .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
        .unwrap_or_default();

    Some(Player {
        id,
        name,
        grade,
        gender,
        play_count,
    })
}

/// Normalize the roster collection.
pub fn players(value: Option<&Value>) -> Vec<Player> {
    let decoded = entries(value)
        .unwrap_or_default()
        .into_iter()
        .filter_map(player_from_value)
        .collect();
    repair_players(decoded)
}

/// Normalize the court collection.
pub fn courts(value: Option<&Value>, layout: BoardLayout) -> Vec<Court> {
    let decoded = entries(value)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(position, raw)| {
            let record = raw.as_object()?;
            let fallback_id = CourtId::try_from(position + 1).unwrap_or(CourtId::MAX);
            let id = record
                .get("id")
                .and_then(as_whole_number)
                .and_then(|id| CourtId::try_from(id).ok())
                .unwrap_or(fallback_id);
            let players = entries(record.get("players"))
                .unwrap_or_default()
                .into_iter()
                .filter(|entry| is_truthy(entry))
                .filter_map(player_from_value)
                .collect();
            let start_time = record.get("startTime").and_then(as_timestamp);
            Some(Court {
                id,
                players,
                start_time,
            })
        })
        .collect();
    repair_courts(decoded, layout)
}

/// Normalize the waiting-queue collection.
pub fn waiting_queues(value: Option<&Value>) -> WaitingQueues {
    let decoded = entries(value)
        .unwrap_or_default()
        .into_iter()
        .map(|raw| {
            let ids = entries(Some(raw))
                .unwrap_or_default()
                .into_iter()
                .filter_map(as_whole_number)
                .collect();
            WaitingQueue::new(ids)
        })
        .collect();
    repair_queues(WaitingQueues::new(decoded))
}

/// Drop duplicate roster entries, keeping the first record for each id.
pub fn repair_players(players: Vec<Player>) -> Vec<Player> {
    let mut seen = HashSet::new();
    players
        .into_iter()
        .filter(|player| seen.insert(player.id))
        .collect()
}

/// Enforce court invariants.
///
/// A court is occupied only when it holds a full complement of
/// [`COURT_CAPACITY`] distinct players and a start time; anything else becomes
/// free. Extra players beyond the capacity are dropped, duplicate court ids are
/// given the lowest unused id, and the list is padded to the layout minimum.
pub fn repair_courts(courts: Vec<Court>, layout: BoardLayout) -> Vec<Court> {
    let mut taken: HashSet<CourtId> = courts.iter().map(|court| court.id).collect();
    let mut seen = HashSet::new();
    let mut repaired: Vec<Court> = courts
        .into_iter()
        .map(|mut court| {
            if !seen.insert(court.id) {
                court.id = lowest_unused_court_id(&mut taken);
                seen.insert(court.id);
            }
            court.players = repair_players(court.players);
            court.players.truncate(COURT_CAPACITY);
            if court.players.len() < COURT_CAPACITY || court.start_time.is_none() {
                court.clear();
            }
            court
        })
        .collect();

    while repaired.len() < layout.min_courts() {
        repaired.push(Court::free(lowest_unused_court_id(&mut taken)));
    }
    repaired
}

/// Claim the smallest positive court id not yet in `taken`.
fn lowest_unused_court_id(taken: &mut HashSet<CourtId>) -> CourtId {
    let id = (1..=CourtId::MAX)
        .find(|id| !taken.contains(id))
        .unwrap_or_default();
    taken.insert(id);
    id
}

/// Enforce queue invariants: capacity, one queue per id, and the minimum count.
pub fn repair_queues(queues: WaitingQueues) -> WaitingQueues {
    let mut seen: HashSet<PlayerId> = HashSet::new();
    let mut repaired = WaitingQueues::new(
        queues
            .into_inner()
            .into_iter()
            .map(|mut queue| {
                queue.retain(|id| seen.insert(*id));
                queue.truncate(QUEUE_CAPACITY);
                queue
            })
            .collect(),
    );
    repaired.pad();
    repaired
}

/// Repair every collection of a board.
pub fn repair_board(board: Board, layout: BoardLayout) -> Board {
    Board {
        players: repair_players(board.players),
        courts: repair_courts(board.courts, layout),
        queues: repair_queues(board.queues),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::models::{courts_to_value, players_to_value, queues_to_value};

    #[test]
    fn absent_snapshots_become_canonical_defaults() {
        let layout = BoardLayout::default();
        assert!(players(None).is_empty());
        assert_eq!(courts(Some(&Value::Null), layout), layout.canonical_courts());
        assert_eq!(waiting_queues(None), WaitingQueues::canonical());
    }

    #[test]
    fn malformed_snapshots_fall_back_to_defaults() {
        let layout = BoardLayout::default();
        let junk = json!("not a collection");
        assert_eq!(shape(Some(&junk)), SnapshotShape::Malformed);
        assert!(players(Some(&junk)).is_empty());
        assert_eq!(courts(Some(&json!(42)), layout), layout.canonical_courts());
        assert_eq!(waiting_queues(Some(&json!(true))), WaitingQueues::canonical());
    }

    #[test]
    fn mapping_containers_keep_stored_order() {
        let raw = json!({
            "1": {"id": 20, "name": "Second"},
            "0": {"id": 10, "name": "First"},
        });
        assert_eq!(shape(Some(&raw)), SnapshotShape::Mapping);
        let ids: Vec<_> = players(Some(&raw)).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![20, 10]);
    }

    #[test]
    fn player_defaults_are_supplied() {
        let raw = json!([{"id": 7}, {"id": 8, "grade": "Z", "gender": "other", "playCount": -3}, {"name": "no id"}]);
        let roster = players(Some(&raw));
        assert_eq!(roster.len(), 2);
        for player in &roster {
            assert_eq!(player.grade, Grade::D);
            assert_eq!(player.gender, Gender::Male);
            assert_eq!(player.play_count, 0);
            assert_eq!(player.name, "");
        }
    }

    #[test]
    fn courts_are_coerced_and_padded() {
        let raw = json!([
            {"players": [null, {"id": 1, "name": "A"}, 0, {"id": 2}, {"id": 3}, {"id": 4}], "startTime": 1_000},
            {"id": "two", "players": [{"id": 5}], "startTime": "yesterday"},
        ]);
        let repaired = courts(Some(&raw), BoardLayout::default());

        assert_eq!(repaired.len(), 3);
        assert_eq!(repaired[0].id, 1);
        assert_eq!(repaired[0].players.len(), 4);
        assert_eq!(repaired[0].start_time, Some(1_000));
        assert_eq!(repaired[1].id, 2);
        assert!(repaired[1].is_free());
        assert_eq!(repaired[1].start_time, None);
        assert_eq!(repaired[2].id, 3);
    }

    #[test]
    fn largest_court_id_does_not_break_padding() {
        let repaired = courts(Some(&json!([{"id": 4_294_967_295u64}])), BoardLayout::default());
        let ids: Vec<_> = repaired.iter().map(|court| court.id).collect();
        assert_eq!(ids, vec![CourtId::MAX, 1, 2]);

        let duplicated = courts(
            Some(&json!([{"id": 4_294_967_295u64}, {"id": 4_294_967_295u64}, {"id": 1}])),
            BoardLayout::default(),
        );
        let ids: Vec<_> = duplicated.iter().map(|court| court.id).collect();
        assert_eq!(ids, vec![CourtId::MAX, 2, 1]);
    }

    #[test]
    fn short_handed_courts_are_freed() {
        let raw = json!([
            {"id": 1, "players": [{"id": 1}, null, {"id": 3}, {"id": 4}], "startTime": 5},
            {"id": 2, "players": [{"id": 5}, {"id": 5}, {"id": 6}, {"id": 7}], "startTime": 5},
        ]);
        let repaired = courts(Some(&raw), BoardLayout::default());

        for court in &repaired {
            assert!(court.is_free(), "court {} should be free", court.id);
            assert_eq!(court.start_time, None);
        }
    }

    #[test]
    fn queues_keep_numeric_ids_and_one_queue_per_player() {
        let raw = json!([[1, "x", 2, null], {"a": 2, "b": 3}, "junk", [4, 5, 6, 7, 8]]);
        let queues = waiting_queues(Some(&raw));

        assert_eq!(queues.len(), 4);
        assert_eq!(queues.get(0).unwrap().ids(), &[1, 2]);
        assert_eq!(queues.get(1).unwrap().ids(), &[3]);
        assert!(queues.get(2).unwrap().is_empty());
        assert_eq!(queues.get(3).unwrap().ids(), &[4, 5, 6, 7]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let layout = BoardLayout::default();
        let samples = [
            json!(null),
            json!("junk"),
            json!({"0": {"id": 3, "players": [{"id": 1}], "startTime": 5.5}}),
            json!([{"id": 1, "name": "Kim", "grade": "B", "gender": "female", "playCount": 2}, {"id": 1}]),
            json!([[1, 1, 2], [2, 3], {"k": 9}]),
        ];

        for sample in &samples {
            let roster = players(Some(sample));
            assert_eq!(players(Some(&players_to_value(&roster).unwrap())), roster);

            let court_list = courts(Some(sample), layout);
            assert_eq!(courts(Some(&courts_to_value(&court_list).unwrap()), layout), court_list);

            let queues = waiting_queues(Some(sample));
            assert_eq!(waiting_queues(Some(&queues_to_value(&queues).unwrap())), queues);
        }
    }
}
