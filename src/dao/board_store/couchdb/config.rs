use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

/// Default server-side wait for one `_changes` long-poll round.
const DEFAULT_LONGPOLL: Duration = Duration::from_secs(30);

/// Runtime configuration describing how to connect to CouchDB.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server URL, without the database path.
    pub base_url: String,
    /// Database holding the board documents.
    pub database: String,
    /// Basic auth user.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// How long CouchDB may hold a `_changes` request open before answering empty.
    pub longpoll: Duration,
}

impl CouchConfig {
    /// Configuration for an unauthenticated server.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
            longpoll: DEFAULT_LONGPOLL,
        }
    }

    /// Attach basic-auth credentials to the configuration.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Build a configuration from `COUCH_BASE_URL`, `COUCH_DB` and optional credentials.
    pub fn from_env() -> CouchResult<Self> {
        let base_url =
            std::env::var("COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            })?;
        let database = std::env::var("COUCH_DB")
            .map_err(|_| CouchDaoError::MissingEnvVar { var: "COUCH_DB" })?;

        let mut config = Self::new(base_url, database);

        if let (Some(username), Some(password)) = (
            std::env::var("COUCH_USERNAME").ok(),
            std::env::var("COUCH_PASSWORD").ok(),
        ) {
            config = config.with_credentials(username, password);
        }

        if let Some(seconds) = std::env::var("COUCH_LONGPOLL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            config.longpoll = Duration::from_secs(seconds.max(1));
        }

        Ok(config)
    }
}
