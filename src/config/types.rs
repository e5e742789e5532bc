use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings of the console itself, not of the daemon it manages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            base_path: default_base_path(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_base_path() -> String {
    "rest".to_string()
}

pub(super) fn default_poll_interval_secs() -> u64 {
    10
}

pub(super) fn default_request_timeout_secs() -> u64 {
    8
}
