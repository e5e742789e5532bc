use std::fmt;

use async_trait::async_trait;

use crate::types::ClientError;

use super::api_types::{Config, ConnectionsResponse, ErrorEntry, FolderModel, SystemInfo};

/// Transport scheme the console uses to reach the daemon's GUI listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn for_tls(use_tls: bool) -> Self {
        if use_tls {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The REST surface the controller consumes. Implemented over HTTP by
/// [`super::RestClient`]; tests substitute an in-memory daemon.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn version(&self) -> Result<String, ClientError>;
    async fn system(&self) -> Result<SystemInfo, ClientError>;
    async fn config(&self) -> Result<Config, ClientError>;
    async fn config_in_sync(&self) -> Result<bool, ClientError>;
    async fn connections(&self) -> Result<ConnectionsResponse, ClientError>;
    async fn errors(&self) -> Result<Vec<ErrorEntry>, ClientError>;
    async fn model(&self, folder_id: &str) -> Result<FolderModel, ClientError>;

    async fn post_config(&self, config: &Config) -> Result<(), ClientError>;
    async fn restart(&self) -> Result<(), ClientError>;
    async fn shutdown(&self) -> Result<(), ClientError>;
    async fn clear_errors(&self) -> Result<(), ClientError>;

    /// Point subsequent requests at the given scheme.
    fn switch_scheme(&self, scheme: Scheme);
}
