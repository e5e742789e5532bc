use chrono::{DateTime, Utc};

use crate::rest::{Config, ConnectionsResponse, ErrorEntry, FolderModel, Scheme, SystemInfo};
use crate::types::ClientError;

/// The result of one spawned request, delivered back to the controller task.
#[derive(Debug)]
pub enum Completion {
    Version(Result<String, ClientError>),
    System(Result<SystemInfo, ClientError>),
    Config(Result<Config, ClientError>),
    ConfigSync {
        /// Local config generation when the read was issued.
        generation: u64,
        result: Result<bool, ClientError>,
    },
    Model {
        folder_id: String,
        result: Result<FolderModel, ClientError>,
    },
    Connections {
        result: Result<ConnectionsResponse, ClientError>,
        received_at: DateTime<Utc>,
    },
    Errors(Result<Vec<ErrorEntry>, ClientError>),
    Written {
        action: WriteAction,
        result: Result<(), ClientError>,
    },
    /// The sequential reload finished.
    LoadFinished,
    SwitchProtocol(Scheme),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Config,
    Restart,
    Shutdown,
    ClearErrors,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteAction::Config => "config",
            WriteAction::Restart => "restart",
            WriteAction::Shutdown => "shutdown",
            WriteAction::ClearErrors => "error/clear",
        }
    }
}
