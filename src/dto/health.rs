use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::format_system_time;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// When the store was last probed.
    pub checked_at: String,
}

impl HealthResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            checked_at: format_system_time(std::time::SystemTime::now()),
        }
    }

    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self::new("ok")
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded() -> Self {
        Self::new("degraded")
    }
}
