use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{board::BoardRepository, board_store::BoardStore, storage::StorageError},
    services::sync_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the board store, load the board and keep the shared state in
/// degraded mode whenever the store is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn BoardStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        let repository = BoardRepository::new(store.clone(), state.config().layout());
        if let Err(err) = attach(&state, store.clone(), &repository).await {
            warn!(error = %err, "initial board load failed");
            sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
            continue;
        }
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        loop {
            match store.health_check().await {
                Ok(()) => {
                    sleep(HEALTH_POLL_INTERVAL).await;
                }
                Err(err) => {
                    warn!(error = %err, "storage health check failed; entering degraded mode");
                    state.update_degraded(true).await;

                    let mut attempt = 0;
                    let mut reconnect_delay = INITIAL_DELAY;
                    let mut reconnected = false;

                    while attempt < MAX_RECONNECT_ATTEMPTS {
                        let result = match store.try_reconnect().await {
                            Ok(()) => attach(&state, store.clone(), &repository).await,
                            Err(err) => Err(err),
                        };
                        match result {
                            Ok(()) => {
                                info!("storage reconnection succeeded after health check failure");
                                reconnected = true;
                                break;
                            }
                            Err(reconnect_err) => {
                                warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                                attempt += 1;
                                sleep(reconnect_delay).await;
                                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                            }
                        }
                    }

                    if reconnected {
                        sleep(HEALTH_POLL_INTERVAL).await;
                        continue;
                    }
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    state.clear_board_store().await;
                    break;
                }
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Reload the board from `store` and make it the active store.
async fn attach(
    state: &SharedState,
    store: Arc<dyn BoardStore>,
    repository: &BoardRepository,
) -> Result<(), StorageError> {
    let tasks = sync_service::start(state, repository).await?;
    state.install_board_store(store, tasks).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::AppConfig, dao::board_store::memory::MemoryBoardStore, state::AppState,
    };

    #[tokio::test]
    async fn leaves_degraded_mode_once_the_board_is_loaded() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        let store = MemoryBoardStore::new();

        let supervisor = tokio::spawn(run(state.clone(), move || {
            let store: Arc<dyn BoardStore> = Arc::new(store.clone());
            async move { Ok(store) }
        }));

        timeout(Duration::from_secs(1), watcher.wait_for(|degraded| !degraded))
            .await
            .unwrap()
            .unwrap();
        assert!(state.require_repository().await.is_ok());
        supervisor.abort();
    }
}
