//! Client configuration.
//!
//! Values are layered: an optional file first, then `AUTHENA_*` environment
//! variables (`AUTHENA_BASE_URL`, `AUTHENA_TIMEOUT_SECS`).

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root URL of the Authena service, e.g. `https://auth.example.com/v1`.
    pub base_url: String,
    /// Global per-request timeout applied by the transport.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: None,
        }
    }

    pub fn load(file: Option<&Path>) -> Result<Self, ApiError> {
        Self::load_with_env(file, Environment::with_prefix("AUTHENA").try_parsing(true))
    }

    fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self, ApiError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            debug!(path = %path.display(), "loading client config file");
            builder = builder.add_source(File::from(path));
        }
        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
