use std::env;
use std::path::Path;

use serde_json::Value;
use tokio::fs;
use tracing::{info, warn};

use crate::types::ClientError;

use super::types::{default_poll_interval_secs, default_request_timeout_secs};
use super::{paths, Config};

pub const API_URL_ENV: &str = "SYNCTHING_API_URL";

impl Config {
    /// Load configuration from config.json in the app directory.
    /// Falls back to defaults if the file doesn't exist or can't be parsed.
    pub async fn load() -> Self {
        let path = paths::get_config_path();
        let mut config = match Self::load_from(&path).await {
            Ok(config) => config,
            Err(err) => {
                warn!(error = ?err, "Failed to load config.json, using defaults");
                Self::default()
            }
        };
        config.apply_env_override(env::var(API_URL_ENV).ok().as_deref());
        info!(
            api_url = %config.api_url,
            poll_interval_secs = config.poll_interval_secs,
            "Loaded configuration"
        );
        config
    }

    /// Read and normalize a config file. A missing file yields the defaults.
    pub async fn load_from(path: &Path) -> Result<Self, ClientError> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .map_err(|err| ClientError::Config(format!("Failed to read config file: {err}")))?;

        let value: Value = serde_json::from_str(&contents)
            .map_err(|err| ClientError::Config(format!("Failed to parse config.json: {err}")))?;

        let mut config: Config = serde_json::from_value(value).map_err(|err| {
            ClientError::Config(format!("Failed to deserialize config.json: {err}"))
        })?;
        config.normalize();
        Ok(config)
    }

    pub(super) fn apply_env_override(&mut self, custom: Option<&str>) {
        if let Some(custom) = custom {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                self.api_url = trimmed.to_string();
            }
        }
    }

    fn normalize(&mut self) {
        if self.poll_interval_secs == 0 {
            warn!("poll_interval_secs must be positive, using default");
            self.poll_interval_secs = default_poll_interval_secs();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        self.base_path = self.base_path.trim_matches('/').to_string();
    }
}
