use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the board store is reachable, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_repository().await {
        Ok(repository) => {
            if let Err(err) = repository.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
