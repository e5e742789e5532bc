use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full configuration document as served by `GET /config` and accepted by
/// `POST /config`. Fields this client does not model are carried in `extra`
/// so writing the document back never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "Repositories", default)]
    pub folders: Vec<FolderConfig>,
    #[serde(rename = "Nodes", default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(rename = "Options", default)]
    pub options: OptionsConfig,
    #[serde(rename = "GUI", default)]
    pub gui: GuiConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(rename = "NodeID")]
    pub node_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Addresses", default)]
    pub addresses: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeConfig {
    /// Name when set, otherwise the first six characters of the identity.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        short_node_id(&self.node_id)
    }
}

/// First six characters of a node identity.
pub fn short_node_id(node_id: &str) -> &str {
    let end = node_id
        .char_indices()
        .nth(6)
        .map(|(idx, _)| idx)
        .unwrap_or(node_id.len());
    &node_id[..end]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderConfig {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Directory", default)]
    pub directory: String,
    #[serde(rename = "Nodes", default)]
    pub nodes: Vec<FolderNode>,
    #[serde(
        rename = "Versioning",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub versioning: Option<Versioning>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FolderConfig {
    pub fn has_member(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.node_id == node_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    #[serde(rename = "NodeID")]
    pub node_id: String,
}

impl FolderNode {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

/// Wire form of a folder's versioning policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioning {
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Params", default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    #[serde(rename = "ListenAddress", default)]
    pub listen_address: Vec<String>,
    #[serde(rename = "MaxSendKbps", default)]
    pub max_send_kbps: i64,
    #[serde(rename = "RescanIntervalS", default)]
    pub rescan_interval_s: i64,
    #[serde(rename = "ReconnectIntervalS", default)]
    pub reconnect_interval_s: i64,
    #[serde(rename = "ParallelRequests", default)]
    pub parallel_requests: i64,
    #[serde(rename = "MaxChangeKbps", default)]
    pub max_change_kbps: i64,
    #[serde(rename = "GlobalAnnEnabled", default)]
    pub global_ann_enabled: bool,
    #[serde(rename = "LocalAnnEnabled", default)]
    pub local_ann_enabled: bool,
    #[serde(rename = "LocalAnnPort", default)]
    pub local_ann_port: i64,
    #[serde(rename = "StartBrowser", default)]
    pub start_browser: bool,
    #[serde(rename = "UPnPEnabled", default)]
    pub upnp_enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuiConfig {
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "User", default)]
    pub user: String,
    #[serde(rename = "Password", default)]
    pub password: String,
    #[serde(rename = "UseTLS", default)]
    pub use_tls: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SystemInfo {
    #[serde(rename = "myID", default)]
    pub my_id: String,
    #[serde(default)]
    pub goroutines: Option<u64>,
    #[serde(default)]
    pub alloc: Option<u64>,
    #[serde(default)]
    pub sys: Option<u64>,
    #[serde(rename = "cpuPercent", default)]
    pub cpu_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigSyncResponse {
    #[serde(rename = "configInSync")]
    pub config_in_sync: bool,
}

/// Per-folder state reported by `GET /model`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FolderModel {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub invalid: String,
    #[serde(rename = "globalBytes", default)]
    pub global_bytes: u64,
    #[serde(rename = "inSyncBytes", default)]
    pub in_sync_bytes: u64,
    #[serde(rename = "needBytes", default)]
    pub need_bytes: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One row of `GET /connections`, keyed by node identity in the response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawConnection {
    #[serde(rename = "InBytesTotal", default)]
    pub in_bytes_total: u64,
    #[serde(rename = "OutBytesTotal", default)]
    pub out_bytes_total: u64,
    #[serde(rename = "Completion", default)]
    pub completion: Option<f64>,
    #[serde(rename = "Address", default)]
    pub address: Option<String>,
    #[serde(rename = "ClientVersion", default)]
    pub client_version: Option<String>,
}

pub type ConnectionsResponse = HashMap<String, RawConnection>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEntry {
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    #[serde(rename = "Error")]
    pub error: String,
}
