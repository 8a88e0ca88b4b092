/// Domain model of the board.
pub mod board;
/// Admin capability tokens.
pub mod capability;
/// Wall clock and elapsed-time formatting.
pub mod clock;
/// Own-write echo tracking.
pub mod echo;
/// Assignment rules.
pub mod engine;
/// Inbound snapshot normalization.
pub mod normalize;
/// Bounded player selections.
pub mod selection;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::{
    sync::{Mutex, RwLock, mpsc, watch},
    task::JoinHandle,
};

use crate::{
    config::AppConfig,
    dao::{board::BoardRepository, board_store::BoardStore},
    error::ServiceError,
    services::command_processor::Command,
    state::{
        board::{Board, PlayerId},
        echo::EchoTracker,
        engine::AssignmentEngine,
        selection::SelectionSet,
    },
};

pub use self::sse::SseHub;

/// Shared handle passed to every route and task.
pub type SharedState = Arc<AppState>;

/// Selection key used when a client does not identify itself.
pub const DEFAULT_CLIENT: &str = "default";
const COMMAND_BUFFER: usize = 64;
const SSE_CAPACITY: usize = 64;

/// Last normalized board plus the writes whose echo is still expected.
pub struct BoardCache {
    /// Last known board.
    pub board: Board,
    /// Writes waiting for their echo.
    pub echoes: EchoTracker,
}

/// Central application state shared by handlers and background tasks.
pub struct AppState {
    config: AppConfig,
    engine: AssignmentEngine,
    board_store: RwLock<Option<Arc<dyn BoardStore>>>,
    cache: RwLock<BoardCache>,
    selections: DashMap<String, SelectionSet>,
    sse: SseHub,
    degraded: watch::Sender<bool>,
    commands: mpsc::Sender<Command>,
    command_rx: Mutex<Option<mpsc::Receiver<Command>>>,
    sync_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let engine = AssignmentEngine::new(config.layout());
        Arc::new(Self {
            cache: RwLock::new(BoardCache {
                board: Board::canonical(config.layout()),
                echoes: EchoTracker::default(),
            }),
            config,
            engine,
            board_store: RwLock::new(None),
            selections: DashMap::new(),
            sse: SseHub::new(SSE_CAPACITY),
            degraded: degraded_tx,
            commands,
            command_rx: Mutex::new(Some(command_rx)),
            sync_tasks: Mutex::new(Vec::new()),
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Rules engine for the configured layout.
    pub fn engine(&self) -> AssignmentEngine {
        self.engine
    }

    /// Obtain a handle to the current board store, if one is installed.
    pub async fn board_store(&self) -> Option<Arc<dyn BoardStore>> {
        let guard = self.board_store.read().await;
        guard.as_ref().cloned()
    }

    /// Typed repository over the installed store.
    pub async fn require_repository(&self) -> Result<BoardRepository, ServiceError> {
        self.board_store()
            .await
            .map(|store| BoardRepository::new(store, self.config.layout()))
            .ok_or(ServiceError::Degraded)
    }

    /// Install a store whose subscriptions are already followed by `sync_tasks`,
    /// and leave degraded mode.
    pub async fn install_board_store(
        &self,
        store: Arc<dyn BoardStore>,
        sync_tasks: Vec<JoinHandle<()>>,
    ) {
        {
            let mut guard = self.board_store.write().await;
            *guard = Some(store);
        }
        self.replace_sync_tasks(sync_tasks).await;
        self.update_degraded(false).await;
    }

    /// Remove the current store, stop following it and enter degraded mode.
    pub async fn clear_board_store(&self) {
        {
            let mut guard = self.board_store.write().await;
            guard.take();
        }
        self.replace_sync_tasks(Vec::new()).await;
        self.update_degraded(true).await;
    }

    async fn replace_sync_tasks(&self, tasks: Vec<JoinHandle<()>>) {
        let mut guard = self.sync_tasks.lock().await;
        for task in guard.drain(..) {
            task.abort();
        }
        *guard = tasks;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Cached board and echo bookkeeping.
    pub fn cache(&self) -> &RwLock<BoardCache> {
        &self.cache
    }

    /// Snapshot of the cached board.
    pub async fn board(&self) -> Board {
        self.cache.read().await.board.clone()
    }

    /// Current selection of a client.
    pub fn selection(&self, client: &str) -> SelectionSet {
        self.selections
            .get(client)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Replace the selection held for `client`.
    pub fn store_selection(&self, client: &str, selection: SelectionSet) {
        if selection.is_empty() {
            self.selections.remove(client);
        } else {
            self.selections.insert(client.to_string(), selection);
        }
    }

    /// Drop a player from every client's selection.
    pub fn forget_selected(&self, player_id: PlayerId) {
        for mut entry in self.selections.iter_mut() {
            entry.value_mut().remove(player_id);
        }
        self.selections.retain(|_, selection| !selection.is_empty());
    }

    /// Drop every client's selection.
    pub fn clear_selections(&self) {
        self.selections.clear();
    }

    /// Drop selected ids that no longer have a roster entry.
    pub fn prune_selections(&self, board: &Board) {
        for mut entry in self.selections.iter_mut() {
            let stale: Vec<PlayerId> = entry
                .value()
                .ids()
                .into_iter()
                .filter(|id| board.player(*id).is_none())
                .collect();
            for id in stale {
                entry.value_mut().remove(id);
            }
        }
        self.selections.retain(|_, selection| !selection.is_empty());
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Sender side of the single-writer command channel.
    pub fn commands(&self) -> mpsc::Sender<Command> {
        self.commands.clone()
    }

    /// Hand the command receiver to the processor task; only the first caller gets it.
    pub async fn take_command_receiver(&self) -> Option<mpsc::Receiver<Command>> {
        self.command_rx.lock().await.take()
    }
}
