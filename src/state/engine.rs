//! Queue/court assignment rules.
//!
//! The engine is pure: every operation reads the current [`Board`] and either
//! rejects the intent or returns a [`Mutation`] listing the collections to
//! overwrite, in the order they must be written (courts, players, queues).
//! Operations that need the caller's confirmation or choice fail with
//! [`EngineError::DecisionRequired`] before touching anything, so declining is
//! simply not sending the intent again.
//!
//! A player id moves through `Unassigned -> Selected -> Queued -> Playing`:
//! selection toggles stay client-side, Move-to-Queue enqueues a selection,
//! Assign-to-Court moves a full queue onto a court and Clear-Court frees it.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::{
    board::{
        Board, BoardLayout, COURT_CAPACITY, CollectionSnapshot, Court, CourtId, Gender, Grade,
        Player, PlayerId, QUEUE_CAPACITY, WaitingQueue, WaitingQueues,
    },
    selection::{SELECTION_CAPACITY, SelectionSet},
};

/// Where a 1-2 player selection should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueChoice {
    /// Append to the queue at this index.
    Existing(usize),
    /// Push a brand-new queue.
    New,
}

/// Answers the caller supplies up front for prompts the intent may raise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    /// Proceed past a confirmation prompt.
    pub confirmed: bool,
    /// Target queue for small selections.
    pub target: Option<QueueChoice>,
}

impl Decision {
    /// A decision that accepts every confirmation prompt.
    pub fn confirmed() -> Self {
        Self {
            confirmed: true,
            target: None,
        }
    }

    /// Answer the queue choice as well.
    pub fn with_target(mut self, target: QueueChoice) -> Self {
        self.target = Some(target);
        self
    }
}

/// One eligible queue for a small selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct QueueOption {
    /// Zero-based position in the queue list.
    pub index: usize,
    /// One-based label shown to operators.
    pub number: usize,
    /// Players currently waiting in the queue.
    pub current: usize,
    /// Players after adding the selection.
    pub after: usize,
}

/// Question the caller must answer before the intent can proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prompt {
    /// Some selected players are on a court right now.
    ConfirmPlaying {
        /// Names of the players currently playing.
        players: Vec<String>,
    },
    /// Pick an existing queue or create a new one.
    ChooseQueue {
        /// Number of selected players.
        selection_size: usize,
        /// Existing queues with room for the selection.
        options: Vec<QueueOption>,
        /// Index a newly created queue would get.
        new_queue_index: usize,
    },
    /// Take one player out of a queue.
    ConfirmRemoveFromQueue {
        /// Display name of the player.
        player: String,
        /// One-based queue label.
        queue_number: usize,
    },
    /// Delete a player from the roster.
    ConfirmRemovePlayer {
        /// Display name of the player.
        player: String,
    },
    /// Wipe the whole board.
    ConfirmReset,
}

/// Intent that breaks a board rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Registration without a usable name.
    #[error("player name must not be empty")]
    EmptyName,
    /// Move-to-Queue with an empty or oversized selection.
    #[error("selection must hold between 1 and {} players, got {size}", SELECTION_CAPACITY)]
    SelectionSize {
        /// Players currently selected.
        size: usize,
    },
    /// Selecting one more player than the selection can hold.
    #[error("selection already holds {} players", SELECTION_CAPACITY)]
    SelectionFull,
    /// Players that already wait in some queue.
    #[error("already waiting in a queue: {}", .players.join(", "))]
    AlreadyQueued {
        /// Names of the queued players.
        players: Vec<String>,
    },
    /// Assign-to-Court from a queue that is not full.
    #[error("queue {number} holds {len} players, {} are required", QUEUE_CAPACITY)]
    QueueNotFull {
        /// One-based queue label.
        number: usize,
        /// Players currently in the queue.
        len: usize,
    },
    /// Picked queue has no room for the selection.
    #[error("queue {number} cannot take {size} more players")]
    QueueNotEligible {
        /// One-based queue label.
        number: usize,
        /// Players in the selection.
        size: usize,
    },
    /// Ids with no roster entry.
    #[error("unknown players: {ids:?}")]
    UnknownPlayers {
        /// The unresolved ids.
        ids: Vec<PlayerId>,
    },
    /// Assign-to-Court on a court that still hosts a game.
    #[error("court {court_id} is in use; clear it first")]
    CourtOccupied {
        /// The occupied court.
        court_id: CourtId,
    },
}

/// Entity an intent referred to that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Missing {
    /// No roster entry with this id.
    #[error("player {0} not found")]
    Player(PlayerId),
    /// No court with this id.
    #[error("court {0} not found")]
    Court(CourtId),
    /// No queue at this index.
    #[error("queue {} not found", .0 + 1)]
    Queue(usize),
    /// The queue exists but does not hold the player.
    #[error("player {player_id} is not in queue {}", .queue_index + 1)]
    QueuedPlayer {
        /// Player the caller named.
        player_id: PlayerId,
        /// Queue the caller named.
        queue_index: usize,
    },
}

/// Why the engine refused an intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The intent breaks a board rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Hard conflict: no confirmation can override it.
    #[error("already playing on another court: {}", .players.join(", "))]
    ConflictBlock {
        /// Names of the players on the other court.
        players: Vec<String>,
    },
    /// The caller must answer the prompt and resend.
    #[error("a decision is required before proceeding")]
    DecisionRequired(Prompt),
    /// The intent named something that does not exist.
    #[error(transparent)]
    NotFound(#[from] Missing),
}

/// Collections an accepted intent rewrites, in write order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mutation {
    writes: Vec<CollectionSnapshot>,
}

impl Mutation {
    fn new(courts: Option<Vec<Court>>, players: Option<Vec<Player>>, queues: Option<WaitingQueues>) -> Self {
        let writes = [
            courts.map(CollectionSnapshot::Courts),
            players.map(CollectionSnapshot::Players),
            queues.map(CollectionSnapshot::WaitingQueues),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self { writes }
    }

    /// Snapshots to write, in order.
    pub fn writes(&self) -> &[CollectionSnapshot] {
        &self.writes
    }

    /// Take the snapshots out, in write order.
    pub fn into_writes(self) -> Vec<CollectionSnapshot> {
        self.writes
    }

    /// Board as it looks once every write has landed.
    pub fn applied_to(&self, board: &Board) -> Board {
        let mut next = board.clone();
        for snapshot in &self.writes {
            next.replace(snapshot.clone());
        }
        next
    }
}

/// How the queue list is tidied after an operation rewrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compaction {
    /// Only pad back up to the minimum.
    Pad,
    /// Drop trailing empty queues beyond the minimum, then pad.
    Trim,
}

/// Applies the assignment rules for one venue layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentEngine {
    layout: BoardLayout,
}

impl AssignmentEngine {
    /// Engine for a venue with the given court layout.
    pub fn new(layout: BoardLayout) -> Self {
        Self { layout }
    }

    /// Court layout the engine resets to.
    pub fn layout(&self) -> BoardLayout {
        self.layout
    }

    /// Flip a player's membership in `selection`, returning whether it is now selected.
    pub fn toggle_selection(
        &self,
        board: &Board,
        selection: &mut SelectionSet,
        player_id: PlayerId,
    ) -> Result<bool, EngineError> {
        if selection.remove(player_id) {
            return Ok(false);
        }
        if board.player(player_id).is_none() {
            return Err(Missing::Player(player_id).into());
        }
        if board.queues.contains(player_id) {
            return Err(ValidationError::AlreadyQueued {
                players: board.names_of(&[player_id]),
            }
            .into());
        }
        selection
            .insert(player_id)
            .map_err(|_| ValidationError::SelectionFull)?;
        Ok(true)
    }

    /// Queues that can absorb a selection of `size` players.
    pub fn queue_options(&self, board: &Board, size: usize) -> Vec<QueueOption> {
        board
            .queues
            .iter()
            .enumerate()
            .filter(|(_, queue)| queue.is_empty() || queue.len() + size <= QUEUE_CAPACITY)
            .map(|(index, queue)| QueueOption {
                index,
                number: index + 1,
                current: queue.len(),
                after: queue.len() + size,
            })
            .collect()
    }

    /// Enqueue the selected players.
    ///
    /// Three or four players always get a new queue of their own. One or two
    /// players go to the queue the caller picked among [`Self::queue_options`].
    pub fn move_to_queue(
        &self,
        board: &Board,
        selection: &SelectionSet,
        decision: Decision,
    ) -> Result<Mutation, EngineError> {
        let ids = selection.ids();
        let size = ids.len();
        if !(1..=SELECTION_CAPACITY).contains(&size) {
            return Err(ValidationError::SelectionSize { size }.into());
        }

        let unknown: Vec<PlayerId> = ids
            .iter()
            .copied()
            .filter(|id| board.player(*id).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownPlayers { ids: unknown }.into());
        }

        let queued: Vec<PlayerId> = ids
            .iter()
            .copied()
            .filter(|id| board.queues.contains(*id))
            .collect();
        if !queued.is_empty() {
            return Err(ValidationError::AlreadyQueued {
                players: board.names_of(&queued),
            }
            .into());
        }

        let playing = board.playing_ids();
        let on_court: Vec<PlayerId> = ids.iter().copied().filter(|id| playing.contains(id)).collect();
        if !on_court.is_empty() && !decision.confirmed {
            return Err(EngineError::DecisionRequired(Prompt::ConfirmPlaying {
                players: board.names_of(&on_court),
            }));
        }

        let mut queues = board.queues.clone();
        if size >= 3 {
            queues.push(WaitingQueue::new(ids));
        } else {
            match decision.target {
                None => {
                    return Err(EngineError::DecisionRequired(Prompt::ChooseQueue {
                        selection_size: size,
                        options: self.queue_options(board, size),
                        new_queue_index: queues.len(),
                    }));
                }
                Some(QueueChoice::New) => {
                    queues.push(WaitingQueue::new(ids));
                }
                Some(QueueChoice::Existing(index)) => {
                    let eligible = self
                        .queue_options(board, size)
                        .iter()
                        .any(|option| option.index == index);
                    let queue = queues.get_mut(index).ok_or(Missing::Queue(index))?;
                    if !eligible {
                        return Err(ValidationError::QueueNotEligible {
                            number: index + 1,
                            size,
                        }
                        .into());
                    }
                    queue.extend(ids);
                }
            }
        }

        compact(board, &mut queues, Compaction::Pad);
        Ok(Mutation::new(None, None, Some(queues)))
    }

    /// Take one player out of the named queue only.
    pub fn remove_from_queue(
        &self,
        board: &Board,
        player_id: PlayerId,
        queue_index: usize,
        decision: Decision,
    ) -> Result<Mutation, EngineError> {
        let queue = board.queues.get(queue_index).ok_or(Missing::Queue(queue_index))?;
        if !queue.contains(player_id) {
            return Err(Missing::QueuedPlayer {
                player_id,
                queue_index,
            }
            .into());
        }
        if !decision.confirmed {
            return Err(EngineError::DecisionRequired(Prompt::ConfirmRemoveFromQueue {
                player: display_name(board, player_id),
                queue_number: queue_index + 1,
            }));
        }

        let mut queues = board.queues.clone();
        if let Some(queue) = queues.get_mut(queue_index) {
            queue.remove(player_id);
        }
        compact(board, &mut queues, Compaction::Trim);
        Ok(Mutation::new(None, None, Some(queues)))
    }

    /// Move a full queue onto a free court and count a game for each of its players.
    ///
    /// An occupied court must be cleared first. The court keeps copies of the
    /// players in roster order, taken before their play counts go up.
    pub fn assign_to_court(
        &self,
        board: &Board,
        court_id: CourtId,
        queue_index: usize,
        now_ms: i64,
    ) -> Result<Mutation, EngineError> {
        let court = board.court(court_id).ok_or(Missing::Court(court_id))?;
        if !court.is_free() {
            return Err(ValidationError::CourtOccupied { court_id }.into());
        }
        let queue = board.queues.get(queue_index).ok_or(Missing::Queue(queue_index))?;
        if queue.len() != COURT_CAPACITY {
            return Err(ValidationError::QueueNotFull {
                number: queue_index + 1,
                len: queue.len(),
            }
            .into());
        }

        let ids = queue.ids();
        let unknown: Vec<PlayerId> = ids
            .iter()
            .copied()
            .filter(|id| board.player(*id).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownPlayers { ids: unknown }.into());
        }

        let elsewhere: Vec<PlayerId> = ids
            .iter()
            .copied()
            .filter(|id| {
                board
                    .courts
                    .iter()
                    .any(|court| court.id != court_id && court.hosts(*id))
            })
            .collect();
        if !elsewhere.is_empty() {
            return Err(EngineError::ConflictBlock {
                players: board.names_of(&elsewhere),
            });
        }

        let lineup: Vec<Player> = board
            .players
            .iter()
            .filter(|player| ids.contains(&player.id))
            .cloned()
            .collect();

        let mut courts = board.courts.clone();
        if let Some(court) = courts.iter_mut().find(|court| court.id == court_id) {
            court.players = lineup;
            court.start_time = Some(now_ms);
        }

        let mut players = board.players.clone();
        for player in players.iter_mut().filter(|player| ids.contains(&player.id)) {
            player.play_count = player.play_count.saturating_add(1);
        }

        let mut queues = board.queues.clone();
        if let Some(queue) = queues.get_mut(queue_index) {
            queue.clear();
        }
        compact(board, &mut queues, Compaction::Trim);

        Ok(Mutation::new(Some(courts), Some(players), Some(queues)))
    }

    /// Free a court. Play counts and queues are untouched.
    pub fn clear_court(&self, board: &Board, court_id: CourtId) -> Result<Mutation, EngineError> {
        let mut courts = board.courts.clone();
        let court = courts
            .iter_mut()
            .find(|court| court.id == court_id)
            .ok_or(Missing::Court(court_id))?;
        court.clear();
        Ok(Mutation::new(Some(courts), None, None))
    }

    /// Delete a player from the roster and from every queue.
    ///
    /// Court copies stay until the court is cleared; selection sets are the
    /// caller's to clean up.
    pub fn remove_player(
        &self,
        board: &Board,
        player_id: PlayerId,
        decision: Decision,
    ) -> Result<Mutation, EngineError> {
        let player = board.player(player_id).ok_or(Missing::Player(player_id))?;
        if !decision.confirmed {
            return Err(EngineError::DecisionRequired(Prompt::ConfirmRemovePlayer {
                player: player.name.clone(),
            }));
        }

        let players: Vec<Player> = board
            .players
            .iter()
            .filter(|player| player.id != player_id)
            .cloned()
            .collect();

        let mut queues = board.queues.clone();
        for queue in queues.iter_mut() {
            queue.remove(player_id);
        }
        let remaining = Board {
            players: players.clone(),
            courts: Vec::new(),
            queues: WaitingQueues::default(),
        };
        compact(&remaining, &mut queues, Compaction::Trim);

        Ok(Mutation::new(None, Some(players), Some(queues)))
    }

    /// Register a player. Open to every caller.
    pub fn add_player(
        &self,
        board: &Board,
        name: &str,
        grade: Grade,
        gender: Gender,
        now_ms: i64,
    ) -> Result<(Mutation, Player), EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let player = Player {
            id: board.fresh_player_id(now_ms),
            name: name.to_string(),
            grade,
            gender,
            play_count: 0,
        };
        let mut players = board.players.clone();
        players.push(player.clone());
        Ok((Mutation::new(None, Some(players), None), player))
    }

    /// Wipe the roster, free every canonical court and empty the queues.
    pub fn reset_all(&self, decision: Decision) -> Result<Mutation, EngineError> {
        if !decision.confirmed {
            return Err(EngineError::DecisionRequired(Prompt::ConfirmReset));
        }
        let canonical = Board::canonical(self.layout);
        Ok(Mutation::new(
            Some(canonical.courts),
            Some(canonical.players),
            Some(canonical.queues),
        ))
    }
}

fn display_name(board: &Board, player_id: PlayerId) -> String {
    board
        .names_of(&[player_id])
        .pop()
        .unwrap_or_else(|| format!("#{player_id}"))
}

/// Prune ids with no roster entry, then tidy the list length.
fn compact(board: &Board, queues: &mut WaitingQueues, mode: Compaction) {
    for queue in queues.iter_mut() {
        queue.retain(|id| board.player(*id).is_some());
    }
    match mode {
        Compaction::Pad => queues.pad(),
        Compaction::Trim => queues.compact(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::MIN_QUEUES;

    const NOW: i64 = 1_700_000_000_000;

    fn board_with(count: u64) -> Board {
        let mut board = Board::canonical(BoardLayout::default());
        board.players = (1..=count)
            .map(|id| Player {
                id,
                name: format!("P{id}"),
                grade: Grade::D,
                gender: Gender::Male,
                play_count: 0,
            })
            .collect();
        board
    }

    fn selection(ids: &[PlayerId]) -> SelectionSet {
        let mut selection = SelectionSet::new();
        for id in ids {
            selection.insert(*id).unwrap();
        }
        selection
    }

    fn queue_ids(board: &Board) -> Vec<Vec<PlayerId>> {
        board.queues.iter().map(|queue| queue.ids().to_vec()).collect()
    }

    fn assert_invariants(board: &Board) {
        assert!(board.queues.len() >= MIN_QUEUES);
        for queue in board.queues.iter() {
            assert!(queue.len() <= QUEUE_CAPACITY);
        }
        for court in &board.courts {
            assert!(court.players.is_empty() || court.players.len() == COURT_CAPACITY);
            assert_eq!(court.start_time.is_none(), court.players.is_empty());
        }
    }

    #[test]
    fn add_player_trims_name_and_starts_at_zero() {
        let engine = AssignmentEngine::default();
        let board = Board::canonical(BoardLayout::default());
        let (mutation, player) = engine
            .add_player(&board, "  Kim ", Grade::B, Gender::Female, NOW)
            .unwrap();

        assert_eq!(player.name, "Kim");
        assert_eq!(player.play_count, 0);
        assert_eq!(mutation.applied_to(&board).players, vec![player]);
        assert_eq!(
            engine.add_player(&board, "   ", Grade::D, Gender::Male, NOW),
            Err(ValidationError::EmptyName.into())
        );
    }

    #[test]
    fn toggling_respects_capacity_and_queue_membership() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(6);
        board.queues = WaitingQueues::new(vec![WaitingQueue::new(vec![6])]);
        board.queues.pad();
        let mut picked = SelectionSet::new();

        for id in 1..=4 {
            assert_eq!(engine.toggle_selection(&board, &mut picked, id), Ok(true));
        }
        assert_eq!(
            engine.toggle_selection(&board, &mut picked, 5),
            Err(ValidationError::SelectionFull.into())
        );
        assert_eq!(picked.len(), 4);

        assert_eq!(engine.toggle_selection(&board, &mut picked, 2), Ok(false));
        assert!(matches!(
            engine.toggle_selection(&board, &mut picked, 6),
            Err(EngineError::Validation(ValidationError::AlreadyQueued { .. }))
        ));
        assert_eq!(
            engine.toggle_selection(&board, &mut picked, 99),
            Err(Missing::Player(99).into())
        );
    }

    #[test]
    fn groups_of_three_or_more_get_a_new_queue() {
        let engine = AssignmentEngine::default();
        let board = board_with(4);
        let next = engine
            .move_to_queue(&board, &selection(&[1, 2, 3, 4]), Decision::default())
            .unwrap()
            .applied_to(&board);

        assert_eq!(
            queue_ids(&next),
            vec![vec![], vec![], vec![], vec![1, 2, 3, 4]]
        );
        assert_invariants(&next);
    }

    #[test]
    fn small_selection_asks_for_a_target() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(6);
        board.queues = WaitingQueues::new(vec![
            WaitingQueue::new(vec![3, 4, 5]),
            WaitingQueue::new(vec![6]),
            WaitingQueue::default(),
        ]);

        let prompt = engine
            .move_to_queue(&board, &selection(&[1, 2]), Decision::default())
            .unwrap_err();
        let EngineError::DecisionRequired(Prompt::ChooseQueue {
            selection_size,
            options,
            new_queue_index,
        }) = prompt
        else {
            panic!("expected a queue choice, got {prompt:?}");
        };
        assert_eq!(selection_size, 2);
        assert_eq!(new_queue_index, 3);
        let indices: Vec<_> = options.iter().map(|option| option.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(options[0].current, 1);
        assert_eq!(options[0].after, 3);

        let next = engine
            .move_to_queue(
                &board,
                &selection(&[1, 2]),
                Decision::default().with_target(QueueChoice::Existing(1)),
            )
            .unwrap()
            .applied_to(&board);
        assert_eq!(queue_ids(&next)[1], vec![6, 1, 2]);

        assert_eq!(
            engine.move_to_queue(
                &board,
                &selection(&[1, 2]),
                Decision::default().with_target(QueueChoice::Existing(0)),
            ),
            Err(ValidationError::QueueNotEligible { number: 1, size: 2 }.into())
        );

        let fresh = engine
            .move_to_queue(
                &board,
                &selection(&[1]),
                Decision::default().with_target(QueueChoice::New),
            )
            .unwrap()
            .applied_to(&board);
        assert_eq!(queue_ids(&fresh).last(), Some(&vec![1]));
    }

    #[test]
    fn playing_players_need_confirmation_to_queue() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(4);
        board.courts[0].players = board.players.clone();
        board.courts[0].start_time = Some(NOW);

        assert_eq!(
            engine.move_to_queue(&board, &selection(&[1, 2, 3]), Decision::default()),
            Err(EngineError::DecisionRequired(Prompt::ConfirmPlaying {
                players: vec!["P1".into(), "P2".into(), "P3".into()],
            }))
        );
        assert!(
            engine
                .move_to_queue(&board, &selection(&[1, 2, 3]), Decision::confirmed())
                .is_ok()
        );
    }

    #[test]
    fn selection_size_is_validated() {
        let engine = AssignmentEngine::default();
        let board = board_with(4);
        assert_eq!(
            engine.move_to_queue(&board, &SelectionSet::new(), Decision::default()),
            Err(ValidationError::SelectionSize { size: 0 }.into())
        );
    }

    #[test]
    fn queued_players_cannot_be_enqueued_twice() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(4);
        board.queues = WaitingQueues::new(vec![WaitingQueue::new(vec![1])]);
        board.queues.pad();

        assert!(matches!(
            engine.move_to_queue(&board, &selection(&[1, 2, 3]), Decision::default()),
            Err(EngineError::Validation(ValidationError::AlreadyQueued { .. }))
        ));
    }

    #[test]
    fn assigning_a_full_queue_fills_the_court_and_counts_games() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(5);
        board.queues = WaitingQueues::new(vec![
            WaitingQueue::default(),
            WaitingQueue::new(vec![4, 3, 2, 1]),
            WaitingQueue::default(),
            WaitingQueue::default(),
        ]);

        let mutation = engine.assign_to_court(&board, 2, 1, NOW).unwrap();
        let order: Vec<_> = mutation
            .writes()
            .iter()
            .map(CollectionSnapshot::collection)
            .collect();
        assert_eq!(
            order,
            vec![
                crate::dao::board_store::Collection::Courts,
                crate::dao::board_store::Collection::Players,
                crate::dao::board_store::Collection::WaitingQueues,
            ]
        );

        let next = mutation.applied_to(&board);
        let court = next.court(2).unwrap();
        let seated: Vec<_> = court.players.iter().map(|player| player.id).collect();
        assert_eq!(seated, vec![1, 2, 3, 4]);
        assert_eq!(court.start_time, Some(NOW));
        assert!(court.players.iter().all(|player| player.play_count == 0));

        for id in 1..=4 {
            assert_eq!(next.player(id).unwrap().play_count, 1);
        }
        assert_eq!(next.player(5).unwrap().play_count, 0);
        assert_eq!(queue_ids(&next), vec![Vec::<PlayerId>::new(); 3]);
        assert_invariants(&next);
    }

    #[test]
    fn short_queue_is_rejected() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(3);
        board.queues = WaitingQueues::new(vec![WaitingQueue::new(vec![1, 2, 3])]);
        board.queues.pad();

        assert_eq!(
            engine.assign_to_court(&board, 1, 0, NOW),
            Err(ValidationError::QueueNotFull { number: 1, len: 3 }.into())
        );
    }

    #[test]
    fn players_on_another_court_block_assignment() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(4);
        board.courts[0].players = board.players.clone();
        board.courts[0].start_time = Some(NOW);
        board.queues = WaitingQueues::new(vec![WaitingQueue::new(vec![1, 2, 3, 4])]);
        board.queues.pad();

        assert_eq!(
            engine.assign_to_court(&board, 2, 0, NOW),
            Err(EngineError::ConflictBlock {
                players: vec!["P1".into(), "P2".into(), "P3".into(), "P4".into()],
            })
        );
    }

    #[test]
    fn occupied_court_must_be_cleared_first() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(8);
        board.courts[0].players = board.players[..4].to_vec();
        board.courts[0].start_time = Some(NOW);
        board.queues = WaitingQueues::new(vec![WaitingQueue::new(vec![5, 6, 7, 8])]);
        board.queues.pad();

        assert_eq!(
            engine.assign_to_court(&board, 1, 0, NOW),
            Err(ValidationError::CourtOccupied { court_id: 1 }.into())
        );

        let cleared = engine.clear_court(&board, 1).unwrap().applied_to(&board);
        let next = engine
            .assign_to_court(&cleared, 1, 0, NOW)
            .unwrap()
            .applied_to(&cleared);
        let seated: Vec<_> = next.court(1).unwrap().players.iter().map(|player| player.id).collect();
        assert_eq!(seated, vec![5, 6, 7, 8]);
        assert_eq!(next.player(1).unwrap().play_count, 0);
    }

    #[test]
    fn unresolved_queue_entries_block_assignment() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(3);
        board.queues = WaitingQueues::new(vec![WaitingQueue::new(vec![1, 2, 3, 42])]);
        board.queues.pad();

        assert_eq!(
            engine.assign_to_court(&board, 1, 0, NOW),
            Err(ValidationError::UnknownPlayers { ids: vec![42] }.into())
        );
    }

    #[test]
    fn remove_from_queue_needs_confirmation_and_touches_one_queue() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(3);
        board.queues = WaitingQueues::new(vec![
            WaitingQueue::new(vec![1, 2]),
            WaitingQueue::default(),
            WaitingQueue::default(),
            WaitingQueue::new(vec![3]),
        ]);

        assert_eq!(
            engine.remove_from_queue(&board, 1, 0, Decision::default()),
            Err(EngineError::DecisionRequired(Prompt::ConfirmRemoveFromQueue {
                player: "P1".into(),
                queue_number: 1,
            }))
        );
        assert_eq!(
            engine.remove_from_queue(&board, 1, 3, Decision::confirmed()),
            Err(Missing::QueuedPlayer {
                player_id: 1,
                queue_index: 3
            }
            .into())
        );

        let next = engine
            .remove_from_queue(&board, 3, 3, Decision::confirmed())
            .unwrap()
            .applied_to(&board);
        assert_eq!(queue_ids(&next), vec![vec![1, 2], vec![], vec![]]);
    }

    #[test]
    fn clear_court_keeps_counts_and_queues() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(4);
        board.courts[0].players = board.players.clone();
        board.courts[0].start_time = Some(NOW);
        board.players[0].play_count = 3;

        let next = engine.clear_court(&board, 1).unwrap().applied_to(&board);
        assert!(next.court(1).unwrap().is_free());
        assert_eq!(next.court(1).unwrap().start_time, None);
        assert_eq!(next.players, board.players);
        assert_eq!(next.queues, board.queues);
        assert_eq!(
            engine.clear_court(&board, 9),
            Err(Missing::Court(9).into())
        );
    }

    #[test]
    fn remove_player_cascades_to_every_queue_but_not_courts() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(5);
        board.courts[0].players = board.players[..4].to_vec();
        board.courts[0].start_time = Some(NOW);
        board.queues = WaitingQueues::new(vec![
            WaitingQueue::new(vec![1, 5]),
            WaitingQueue::new(vec![1]),
            WaitingQueue::default(),
        ]);

        assert_eq!(
            engine.remove_player(&board, 1, Decision::default()),
            Err(EngineError::DecisionRequired(Prompt::ConfirmRemovePlayer {
                player: "P1".into()
            }))
        );

        let next = engine
            .remove_player(&board, 1, Decision::confirmed())
            .unwrap()
            .applied_to(&board);
        assert!(next.player(1).is_none());
        assert_eq!(queue_ids(&next), vec![vec![5], vec![], vec![]]);
        assert!(next.court(1).unwrap().hosts(1));
    }

    #[test]
    fn reset_restores_the_canonical_board() {
        let engine = AssignmentEngine::new(BoardLayout::new(4));
        let board = board_with(4);
        assert_eq!(
            engine.reset_all(Decision::default()),
            Err(EngineError::DecisionRequired(Prompt::ConfirmReset))
        );
        let next = engine
            .reset_all(Decision::confirmed())
            .unwrap()
            .applied_to(&board);
        assert_eq!(next, Board::canonical(BoardLayout::new(4)));
    }

    #[test]
    fn play_counts_only_ever_grow() {
        let engine = AssignmentEngine::default();
        let mut board = board_with(8);

        for round in 0..3u32 {
            for group in [[1, 2, 3, 4], [5, 6, 7, 8]] {
                board = engine
                    .move_to_queue(&board, &selection(&group), Decision::confirmed())
                    .unwrap()
                    .applied_to(&board);
                let index = board.queues.position_of(group[0]).unwrap();
                let court = if group[0] == 1 { 1 } else { 2 };
                board = engine
                    .assign_to_court(&board, court, index, NOW)
                    .unwrap()
                    .applied_to(&board);
                assert_invariants(&board);
            }
            for player in &board.players {
                assert_eq!(player.play_count, round + 1);
            }
        }
    }
}
