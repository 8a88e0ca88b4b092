//! Read models of the board served over REST and SSE.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{format_millis, validation::validate_player_name},
    state::{
        board::{
            Board, Court, CourtId, Gender, Grade, Player, PlayerId, PlayerStatus, QUEUE_CAPACITY,
        },
        clock::elapsed,
    },
};

/// Where a registered player currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Neither queued nor playing.
    Idle,
    /// Waiting in a queue.
    Queued,
    /// On a court.
    Playing,
}

/// Roster entry with its current position on the board.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerView {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Skill tier.
    pub grade: Grade,
    /// Display grouping.
    pub gender: Gender,
    /// Games played so far.
    pub play_count: u32,
    /// `playing` wins when a player is both on a court and queued.
    pub status: PlayerState,
    /// Court hosting the player.
    pub court_id: Option<CourtId>,
    /// Queue holding the player.
    pub queue_index: Option<usize>,
}

impl PlayerView {
    /// Project a roster entry with its board position.
    pub fn new(player: &Player, position: PlayerStatus) -> Self {
        let status = match (position.court, position.queue) {
            (Some(_), _) => PlayerState::Playing,
            (None, Some(_)) => PlayerState::Queued,
            (None, None) => PlayerState::Idle,
        };
        Self {
            id: player.id,
            name: player.name.clone(),
            grade: player.grade,
            gender: player.gender,
            play_count: player.play_count,
            status,
            court_id: position.court,
            queue_index: position.queue,
        }
    }
}

/// Player as shown on a court or in a queue.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Skill tier.
    pub grade: Grade,
    /// Display grouping.
    pub gender: Gender,
    /// Games played so far.
    pub play_count: u32,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            grade: player.grade,
            gender: player.gender,
            play_count: player.play_count,
        }
    }
}

/// A court with its clock.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourtView {
    /// Court id.
    pub id: CourtId,
    /// Copies taken when the court was assigned.
    pub players: Vec<PlayerSummary>,
    /// Milliseconds since the Unix epoch.
    pub start_time: Option<i64>,
    /// RFC 3339 form of `start_time`.
    pub started_at: Option<String>,
    /// Occupancy duration as `MM:SS`.
    pub elapsed: String,
}

impl CourtView {
    /// View of `court` at `now_ms`.
    pub fn build(court: &Court, now_ms: i64) -> Self {
        Self {
            id: court.id,
            players: court.players.iter().map(PlayerSummary::from).collect(),
            start_time: court.start_time,
            started_at: court.start_time.map(format_millis),
            elapsed: elapsed(court.start_time, now_ms),
        }
    }
}

/// A waiting queue with resolved players.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueView {
    /// Zero-based position.
    pub index: usize,
    /// One-based label.
    pub number: usize,
    /// Waiting players; ids without a roster entry are left out.
    pub players: Vec<PlayerSummary>,
    /// Whether the queue can take a court.
    pub full: bool,
}

/// Whole board as seen by every client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BoardView {
    /// RFC 3339 time the view was built.
    pub generated_at: String,
    /// Roster with positions.
    pub players: Vec<PlayerView>,
    /// Every court.
    pub courts: Vec<CourtView>,
    /// Every waiting queue.
    pub queues: Vec<QueueView>,
}

impl BoardView {
    /// View of the whole board at `now_ms`.
    pub fn build(board: &Board, now_ms: i64) -> Self {
        Self {
            generated_at: format_millis(now_ms),
            players: player_views(board),
            courts: court_views(board, now_ms),
            queues: queue_views(board),
        }
    }
}

/// Roster views in roster order.
pub fn player_views(board: &Board) -> Vec<PlayerView> {
    board
        .players
        .iter()
        .map(|player| PlayerView::new(player, board.status_of(player.id)))
        .collect()
}

/// Court views at `now_ms`.
pub fn court_views(board: &Board, now_ms: i64) -> Vec<CourtView> {
    board
        .courts
        .iter()
        .map(|court| CourtView::build(court, now_ms))
        .collect()
}

/// View of one queue, if it exists.
pub fn queue_view(board: &Board, index: usize) -> Option<QueueView> {
    let queue = board.queues.get(index)?;
    Some(QueueView {
        index,
        number: index + 1,
        players: queue
            .ids()
            .iter()
            .filter_map(|id| board.player(*id))
            .map(PlayerSummary::from)
            .collect(),
        full: queue.len() >= QUEUE_CAPACITY,
    })
}

/// Views of every queue.
pub fn queue_views(board: &Board) -> Vec<QueueView> {
    (0..board.queues.len())
        .filter_map(|index| queue_view(board, index))
        .collect()
}

/// Open registration form.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddPlayerRequest {
    /// Display name; trimmed, at most 40 characters.
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
    /// Defaults to `D`.
    #[serde(default)]
    pub grade: Grade,
    /// Defaults to `male`.
    #[serde(default)]
    pub gender: Gender,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::{BoardLayout, WaitingQueue, WaitingQueues};

    fn player(id: PlayerId, name: &str) -> Player {
        Player {
            id,
            name: name.into(),
            grade: Grade::C,
            gender: Gender::Female,
            play_count: 1,
        }
    }

    #[test]
    fn statuses_and_queue_names_are_resolved() {
        let mut board = Board::canonical(BoardLayout::default());
        board.players = vec![player(1, "Kim"), player(2, "Lee"), player(3, "Park")];
        board.courts[1].players = vec![player(1, "Kim")];
        board.courts[1].start_time = Some(0);
        board.queues = WaitingQueues::new(vec![WaitingQueue::new(vec![2, 99])]);
        board.queues.pad();

        let view = BoardView::build(&board, 90_000);
        let statuses: Vec<_> = view.players.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![PlayerState::Playing, PlayerState::Queued, PlayerState::Idle]
        );
        assert_eq!(view.courts[1].elapsed, "01:30");
        assert_eq!(view.courts[0].elapsed, "00:00");
        let queued: Vec<_> = view.queues[0].players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(queued, vec!["Lee"]);
        assert_eq!(view.queues.len(), 3);
    }

    #[test]
    fn registration_defaults_and_validation() {
        let request: AddPlayerRequest = serde_json::from_str(r#"{"name": "Kim"}"#).unwrap();
        assert_eq!(request.grade, Grade::D);
        assert_eq!(request.gender, Gender::Male);
        assert!(request.validate().is_ok());

        let blank: AddPlayerRequest = serde_json::from_str(r#"{"name": "  "}"#).unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn player_view_omits_absent_positions() {
        let mut board = Board::canonical(BoardLayout::default());
        board.players = vec![player(1, "Kim")];
        let json = serde_json::to_value(&player_views(&board)[0]).unwrap();
        assert_eq!(json["status"], "idle");
        assert!(json.get("court_id").is_none());
    }
}
