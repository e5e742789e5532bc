use std::collections::HashMap;

use chrono::{DateTime, Utc};
use semver::Version;

use crate::metrics::{self, FolderStatus, NodeStatus};
use crate::reconcile;
use crate::rest::{
    short_node_id, Config, ErrorEntry, FolderConfig, FolderModel, NodeConfig, SystemInfo,
};
use crate::sampler::ConnectionStats;

/// Everything the console knows about the daemon for one session. Owned by
/// the controller; presentation code reads it through [`crate::Controller::state`].
#[derive(Debug)]
pub struct SessionState {
    pub version: Option<String>,
    pub system: Option<SystemInfo>,
    pub my_id: String,
    pub config: Config,
    /// Whether the daemon has persisted exactly `config`.
    pub config_in_sync: bool,
    pub models: HashMap<String, FolderModel>,
    pub connections: HashMap<String, ConnectionStats>,
    pub errors: Vec<ErrorEntry>,
    pub seen_error: Option<DateTime<Utc>>,
    /// Set when a committed GUI edit flips TLS; consumed by the next restart.
    pub protocol_changed: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            version: None,
            system: None,
            my_id: String::new(),
            config: Config::default(),
            config_in_sync: true,
            models: HashMap::new(),
            connections: HashMap::new(),
            errors: Vec::new(),
            seen_error: None,
            protocol_changed: false,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly fetched config and bring both collections into
    /// display order.
    pub fn load_config(&mut self, mut config: Config) {
        reconcile::sort(&mut config.nodes);
        reconcile::sort(&mut config.folders);
        self.models
            .retain(|id, _| config.folders.iter().any(|f| &f.id == id));
        self.config = config;
    }

    pub fn nodes(&self) -> &[NodeConfig] {
        &self.config.nodes
    }

    pub fn folders(&self) -> &[FolderConfig] {
        &self.config.folders
    }

    pub fn find_node(&self, node_id: &str) -> Option<&NodeConfig> {
        reconcile::find(&self.config.nodes, node_id)
    }

    pub fn find_folder(&self, folder_id: &str) -> Option<&FolderConfig> {
        reconcile::find(&self.config.folders, folder_id)
    }

    pub fn this_node(&self) -> Option<&NodeConfig> {
        self.find_node(&self.my_id)
    }

    pub fn other_nodes(&self) -> impl Iterator<Item = &NodeConfig> {
        self.config
            .nodes
            .iter()
            .filter(move |n| n.node_id != self.my_id)
    }

    /// Display names of the nodes sharing a folder, sorted. Members missing
    /// from the node list show their short identity.
    pub fn folder_member_names(&self, folder_id: &str) -> Vec<&str> {
        let Some(folder) = self.find_folder(folder_id) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = folder
            .nodes
            .iter()
            .map(|member| {
                self.find_node(&member.node_id)
                    .map_or_else(|| short_node_id(&member.node_id), NodeConfig::display_name)
            })
            .collect();
        names.sort_unstable();
        names
    }

    /// Replace every known node identity in `text` with the node's display name.
    pub fn friendly_node_names(&self, text: &str) -> String {
        self.config
            .nodes
            .iter()
            .filter(|node| !node.node_id.is_empty())
            .fold(text.to_string(), |acc, node| {
                acc.replace(&node.node_id, node.display_name())
            })
    }

    pub fn sync_percentage(&self, folder_id: &str) -> u8 {
        metrics::sync_percentage(self.models.get(folder_id))
    }

    pub fn folder_status(&self, folder_id: &str) -> FolderStatus {
        metrics::folder_status(self.models.get(folder_id))
    }

    pub fn node_status(&self, node_id: &str) -> NodeStatus {
        metrics::node_status(self.connections.get(node_id).map(|c| &c.raw))
    }

    /// Client version a node runs: our own daemon's for the local node, the
    /// connection's for peers.
    pub fn node_version(&self, node_id: &str) -> Option<&str> {
        if node_id == self.my_id {
            return self.version.as_deref();
        }
        self.connections
            .get(node_id)
            .and_then(|c| c.raw.client_version.as_deref())
    }

    pub fn daemon_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(parse_daemon_version)
    }

    /// Errors newer than the last acknowledged one.
    pub fn unseen_errors(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.errors
            .iter()
            .filter(move |e| self.seen_error.map_or(true, |seen| e.time > seen))
    }
}

/// Lenient semantic version parse of the daemon's version string
/// (`v0.8.7`, `0.9.0-beta1`).
pub fn parse_daemon_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn node(id: &str, name: &str) -> NodeConfig {
        NodeConfig {
            node_id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn load_config_sorts_and_prunes_models() {
        let mut state = SessionState::new();
        state.models.insert("gone".to_string(), FolderModel::default());
        state.models.insert("kept".to_string(), FolderModel::default());

        state.load_config(Config {
            nodes: vec![node("BBB", "zeta"), node("AAA", "")],
            folders: vec![
                FolderConfig {
                    id: "kept".to_string(),
                    directory: "/z".to_string(),
                    ..Default::default()
                },
                FolderConfig {
                    id: "other".to_string(),
                    directory: "/a".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });

        assert_eq!(state.nodes()[0].node_id, "AAA");
        assert_eq!(state.folders()[0].id, "other");
        assert!(state.models.contains_key("kept"));
        assert!(!state.models.contains_key("gone"));
    }

    #[test]
    fn local_and_other_nodes() {
        let mut state = SessionState::new();
        state.my_id = "AAA".to_string();
        state.version = Some("v0.8.7".to_string());
        state.load_config(Config {
            nodes: vec![node("AAA", "me"), node("BBB", "peer")],
            ..Default::default()
        });

        assert_eq!(state.this_node().map(|n| n.name.as_str()), Some("me"));
        let others: Vec<_> = state.other_nodes().map(|n| n.node_id.as_str()).collect();
        assert_eq!(others, vec!["BBB"]);
        assert_eq!(state.node_version("AAA"), Some("v0.8.7"));
        assert_eq!(state.node_version("BBB"), None);
        assert_eq!(state.node_status("BBB"), NodeStatus::Disconnected);
    }

    #[test]
    fn unseen_errors_respect_watermark() {
        let mut state = SessionState::new();
        let at = |s| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, s).unwrap();
        state.errors = vec![
            ErrorEntry {
                time: at(1),
                error: "first".to_string(),
            },
            ErrorEntry {
                time: at(2),
                error: "second".to_string(),
            },
        ];
        assert_eq!(state.unseen_errors().count(), 2);
        state.seen_error = Some(at(1));
        let unseen: Vec<_> = state.unseen_errors().map(|e| e.error.as_str()).collect();
        assert_eq!(unseen, vec!["second"]);
    }

    #[test]
    fn folder_members_and_error_text_use_display_names() {
        let mut state = SessionState::new();
        state.load_config(Config {
            nodes: vec![node("AAAAAAAAAA", "zulu"), node("BBBBBBBBBB", "")],
            folders: vec![FolderConfig {
                id: "default".to_string(),
                nodes: ["AAAAAAAAAA", "BBBBBBBBBB", "CCCCCCCCCC"]
                    .into_iter()
                    .map(crate::rest::FolderNode::new)
                    .collect(),
                ..Default::default()
            }],
            ..Default::default()
        });

        assert_eq!(
            state.folder_member_names("default"),
            vec!["BBBBBB", "CCCCCC", "zulu"]
        );
        assert!(state.folder_member_names("missing").is_empty());
        assert_eq!(
            state.friendly_node_names("node AAAAAAAAAA refused BBBBBBBBBB"),
            "node zulu refused BBBBBB"
        );
    }

    #[test]
    fn daemon_version_parses_leniently() {
        assert_eq!(parse_daemon_version("v0.8.7"), Some(Version::new(0, 8, 7)));
        assert!(parse_daemon_version("0.9.0-beta1").is_some());
        assert_eq!(parse_daemon_version("unknown-dev"), None);
    }
}
