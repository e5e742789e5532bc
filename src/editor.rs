//! Working copies for settings, node and folder edits.
//!
//! Opening a session clones the target out of the session state; nothing the
//! caller does to the draft is visible until [`ConfigEditor::commit`]. A commit
//! that changes the authoritative config clears `config_in_sync` before any
//! network traffic happens. Sending the config is the controller's job.

use std::collections::BTreeMap;

use tracing::debug;

use crate::reconcile::{self, Upsert};
use crate::rest::{FolderConfig, FolderNode, GuiConfig, NodeConfig, OptionsConfig, Versioning};
use crate::session::SessionState;
use crate::types::ClientError;

pub const DEFAULT_SIMPLE_KEEP: u32 = 5;
const NEW_NODE_ADDRESSES: &str = "dynamic";

/// Folder versioning policy as the editor sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningPolicy {
    None,
    Simple { keep: u32 },
}

impl VersioningPolicy {
    pub fn from_wire(versioning: Option<&Versioning>) -> Self {
        match versioning {
            Some(v) if v.kind == "simple" => VersioningPolicy::Simple {
                keep: v
                    .params
                    .get("keep")
                    .and_then(|keep| keep.trim().parse().ok())
                    .unwrap_or(DEFAULT_SIMPLE_KEEP),
            },
            _ => VersioningPolicy::None,
        }
    }

    pub fn to_wire(self) -> Option<Versioning> {
        match self {
            VersioningPolicy::None => None,
            VersioningPolicy::Simple { keep } => Some(Versioning {
                kind: "simple".to_string(),
                params: BTreeMap::from([("keep".to_string(), keep.to_string())]),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDraft {
    pub options: OptionsConfig,
    pub gui: GuiConfig,
    /// `options.listen_address` as one editable, comma-separated string.
    pub listen_str: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub node: NodeConfig,
    /// `node.addresses` as one editable, comma-separated string.
    pub addresses: String,
    original_id: Option<String>,
}

impl NodeDraft {
    pub fn is_existing(&self) -> bool {
        self.original_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderDraft {
    pub folder: FolderConfig,
    /// Selected member identities; the local node is added on commit.
    pub members: Vec<String>,
    pub simple_versioning: bool,
    pub simple_keep: u32,
    original_id: Option<String>,
}

impl FolderDraft {
    pub fn is_existing(&self) -> bool {
        self.original_id.is_some()
    }

    pub fn select(&mut self, node_id: &str) {
        if !self.members.iter().any(|m| m == node_id) {
            self.members.push(node_id.to_string());
        }
    }

    pub fn deselect(&mut self, node_id: &str) {
        self.members.retain(|m| m != node_id);
    }

    fn policy(&self) -> VersioningPolicy {
        if self.simple_versioning {
            VersioningPolicy::Simple {
                keep: self.simple_keep,
            }
        } else {
            VersioningPolicy::None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkingCopy {
    Settings(SettingsDraft),
    Node(NodeDraft),
    Folder(FolderDraft),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The working copy matched the authoritative value; nothing to send.
    Unchanged,
    /// The local config changed and must be written to the daemon.
    Changed,
}

/// Holds at most one working copy.
#[derive(Debug, Default)]
pub struct ConfigEditor {
    working: Option<WorkingCopy>,
}

impl ConfigEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working(&self) -> Option<&WorkingCopy> {
        self.working.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.working.is_some()
    }

    pub fn open_settings(&mut self, state: &SessionState) {
        self.working = Some(WorkingCopy::Settings(SettingsDraft {
            options: state.config.options.clone(),
            gui: state.config.gui.clone(),
            listen_str: join_addresses(&state.config.options.listen_address),
        }));
    }

    /// Returns `false` when no node has that identity.
    pub fn open_node(&mut self, state: &SessionState, node_id: &str) -> bool {
        let Some(node) = state.find_node(node_id) else {
            return false;
        };
        self.working = Some(WorkingCopy::Node(NodeDraft {
            addresses: join_addresses(&node.addresses),
            original_id: Some(node.node_id.clone()),
            node: node.clone(),
        }));
        true
    }

    pub fn open_new_node(&mut self) {
        self.working = Some(WorkingCopy::Node(NodeDraft {
            node: NodeConfig::default(),
            addresses: NEW_NODE_ADDRESSES.to_string(),
            original_id: None,
        }));
    }

    /// Returns `false` when no folder has that identity.
    pub fn open_folder(&mut self, state: &SessionState, folder_id: &str) -> bool {
        let Some(folder) = state.find_folder(folder_id) else {
            return false;
        };
        let (simple_versioning, simple_keep) =
            match VersioningPolicy::from_wire(folder.versioning.as_ref()) {
                VersioningPolicy::Simple { keep } => (true, keep),
                VersioningPolicy::None => (false, DEFAULT_SIMPLE_KEEP),
            };
        self.working = Some(WorkingCopy::Folder(FolderDraft {
            members: folder.nodes.iter().map(|n| n.node_id.clone()).collect(),
            simple_versioning,
            simple_keep,
            original_id: Some(folder.id.clone()),
            folder: folder.clone(),
        }));
        true
    }

    pub fn open_new_folder(&mut self) {
        self.working = Some(WorkingCopy::Folder(FolderDraft {
            folder: FolderConfig::default(),
            members: Vec::new(),
            simple_versioning: false,
            simple_keep: DEFAULT_SIMPLE_KEEP,
            original_id: None,
        }));
    }

    pub fn settings_mut(&mut self) -> Option<&mut SettingsDraft> {
        match self.working.as_mut() {
            Some(WorkingCopy::Settings(draft)) => Some(draft),
            _ => None,
        }
    }

    pub fn node_mut(&mut self) -> Option<&mut NodeDraft> {
        match self.working.as_mut() {
            Some(WorkingCopy::Node(draft)) => Some(draft),
            _ => None,
        }
    }

    pub fn folder_mut(&mut self) -> Option<&mut FolderDraft> {
        match self.working.as_mut() {
            Some(WorkingCopy::Folder(draft)) => Some(draft),
            _ => None,
        }
    }

    pub fn discard(&mut self) {
        self.working = None;
    }

    /// Apply the working copy to `state` and close the session. A rejected
    /// commit leaves the session open.
    pub fn commit(&mut self, state: &mut SessionState) -> Result<CommitOutcome, ClientError> {
        let working = self.working.clone().ok_or(ClientError::NoSession)?;
        let outcome = match working {
            WorkingCopy::Settings(draft) => commit_settings(draft, state),
            WorkingCopy::Node(draft) => commit_node(draft, state)?,
            WorkingCopy::Folder(draft) => commit_folder(draft, state)?,
        };
        self.working = None;
        if outcome == CommitOutcome::Changed {
            state.config_in_sync = false;
        }
        Ok(outcome)
    }

    /// Remove the node or folder being edited and close the session. Entities
    /// that were never saved are simply dropped. A rejected delete leaves the
    /// session open.
    pub fn delete(&mut self, state: &mut SessionState) -> Result<CommitOutcome, ClientError> {
        let outcome = match self.working.as_ref().ok_or(ClientError::NoSession)? {
            WorkingCopy::Settings(_) => {
                return Err(ClientError::rejected("settings cannot be deleted"));
            }
            WorkingCopy::Node(NodeDraft {
                original_id: Some(node_id),
                ..
            }) => delete_node(node_id, state)?,
            WorkingCopy::Folder(FolderDraft {
                original_id: Some(folder_id),
                ..
            }) => {
                reconcile::remove(&mut state.config.folders, folder_id);
                state.models.remove(folder_id);
                CommitOutcome::Changed
            }
            WorkingCopy::Node(_) | WorkingCopy::Folder(_) => CommitOutcome::Unchanged,
        };
        self.working = None;
        if outcome == CommitOutcome::Changed {
            state.config_in_sync = false;
        }
        Ok(outcome)
    }
}

fn commit_settings(draft: SettingsDraft, state: &mut SessionState) -> CommitOutcome {
    let mut options = draft.options;
    options.listen_address = split_addresses(&draft.listen_str);

    if options == state.config.options && draft.gui == state.config.gui {
        return CommitOutcome::Unchanged;
    }
    if draft.gui.use_tls != state.config.gui.use_tls {
        debug!(use_tls = draft.gui.use_tls, "GUI protocol changes on next restart");
        state.protocol_changed = true;
    }
    state.config.options = options;
    state.config.gui = draft.gui;
    CommitOutcome::Changed
}

fn commit_node(draft: NodeDraft, state: &mut SessionState) -> Result<CommitOutcome, ClientError> {
    let mut node = draft.node;
    node.node_id = normalize_node_id(&node.node_id);
    node.addresses = split_addresses(&draft.addresses);

    if node.node_id.is_empty() {
        return Err(ClientError::rejected("node identity is empty"));
    }
    if let Some(original) = draft.original_id.as_deref() {
        if original != node.node_id {
            return Err(ClientError::rejected("node identity cannot change"));
        }
    }
    if state.find_node(&node.node_id) == Some(&node) {
        return Ok(CommitOutcome::Unchanged);
    }

    let outcome = reconcile::upsert(&mut state.config.nodes, node);
    debug!(?outcome, "Node saved");
    Ok(CommitOutcome::Changed)
}

fn commit_folder(
    draft: FolderDraft,
    state: &mut SessionState,
) -> Result<CommitOutcome, ClientError> {
    let policy = draft.policy();
    let mut folder = draft.folder;
    folder.id = folder.id.trim().to_string();

    if folder.id.is_empty() {
        return Err(ClientError::rejected("folder identity is empty"));
    }
    if let Some(original) = draft.original_id.as_deref() {
        if original != folder.id {
            return Err(ClientError::rejected("folder identity cannot change"));
        }
    }

    let mut members: Vec<String> = Vec::with_capacity(draft.members.len() + 1);
    for member in draft.members {
        if !members.contains(&member) {
            members.push(member);
        }
    }
    if !state.my_id.is_empty() && !members.contains(&state.my_id) {
        members.push(state.my_id.clone());
    }
    folder.nodes = members.into_iter().map(FolderNode::new).collect();
    folder.versioning = policy.to_wire();

    if state.find_folder(&folder.id) == Some(&folder) {
        return Ok(CommitOutcome::Unchanged);
    }

    let outcome = reconcile::upsert(&mut state.config.folders, folder);
    if outcome == Upsert::Inserted {
        debug!("Folder added");
    }
    Ok(CommitOutcome::Changed)
}

fn delete_node(node_id: &str, state: &mut SessionState) -> Result<CommitOutcome, ClientError> {
    if node_id == state.my_id {
        return Err(ClientError::rejected("the local node cannot be removed"));
    }
    reconcile::remove(&mut state.config.nodes, node_id);
    for folder in &mut state.config.folders {
        folder.nodes.retain(|n| n.node_id != node_id);
    }
    Ok(CommitOutcome::Changed)
}

/// Canonical node identity: no spaces or dashes, upper case.
pub fn normalize_node_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect::<String>()
        .trim()
        .to_uppercase()
}

/// Join an address list into the editable string form.
pub fn join_addresses(addresses: &[String]) -> String {
    addresses.join(", ")
}

/// Split the editable string form back into an address list.
pub fn split_addresses(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::Config;

    const ME: &str = "AAAAAAA";
    const PEER: &str = "BBBBBBB";

    fn state() -> SessionState {
        let mut state = SessionState::new();
        state.my_id = ME.to_string();
        state.load_config(Config {
            nodes: vec![
                NodeConfig {
                    node_id: ME.to_string(),
                    name: "me".to_string(),
                    addresses: vec!["dynamic".to_string()],
                    ..Default::default()
                },
                NodeConfig {
                    node_id: PEER.to_string(),
                    name: "peer".to_string(),
                    addresses: vec!["dynamic".to_string()],
                    ..Default::default()
                },
            ],
            folders: vec![FolderConfig {
                id: "default".to_string(),
                directory: "/sync".to_string(),
                nodes: vec![FolderNode::new(ME), FolderNode::new(PEER)],
                versioning: None,
                ..Default::default()
            }],
            options: OptionsConfig {
                listen_address: vec!["0.0.0.0:22000".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        state
    }

    #[test]
    fn address_string_round_trip() {
        let list = vec!["tcp://a:1".to_string(), "dynamic".to_string()];
        assert_eq!(join_addresses(&list), "tcp://a:1, dynamic");
        assert_eq!(split_addresses(" tcp://a:1 ,dynamic,, "), list);
    }

    #[test]
    fn normalizes_node_identity() {
        assert_eq!(normalize_node_id("abc-def ghi"), "ABCDEFGHI");
    }

    #[test]
    fn unchanged_settings_commit_is_a_no_op() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_settings(&state);
        assert_eq!(editor.settings_mut().unwrap().listen_str, "0.0.0.0:22000");

        assert_eq!(editor.commit(&mut state).unwrap(), CommitOutcome::Unchanged);
        assert!(state.config_in_sync);
        assert!(!editor.is_open());
    }

    #[test]
    fn settings_commit_splits_listen_string_and_flags_tls_change() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_settings(&state);
        let draft = editor.settings_mut().unwrap();
        draft.listen_str = "0.0.0.0:22000, [::]:22001".to_string();
        draft.gui.use_tls = true;

        assert_eq!(editor.commit(&mut state).unwrap(), CommitOutcome::Changed);
        assert_eq!(
            state.config.options.listen_address,
            vec!["0.0.0.0:22000", "[::]:22001"]
        );
        assert!(state.config.gui.use_tls);
        assert!(state.protocol_changed);
        assert!(!state.config_in_sync);
    }

    #[test]
    fn discard_leaves_state_untouched() {
        let mut state = state();
        let before = state.config.clone();
        let mut editor = ConfigEditor::new();
        editor.open_node(&state, PEER);
        editor.node_mut().unwrap().node.name = "renamed".to_string();
        editor.discard();

        assert_eq!(state.config, before);
        assert!(matches!(
            editor.commit(&mut state),
            Err(ClientError::NoSession)
        ));
    }

    #[test]
    fn new_node_is_normalized_and_inserted() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_new_node();
        let draft = editor.node_mut().unwrap();
        assert_eq!(draft.addresses, "dynamic");
        draft.node.node_id = "ccc-cccc".to_string();
        draft.addresses = "10.0.0.5:22000, dynamic".to_string();

        assert_eq!(editor.commit(&mut state).unwrap(), CommitOutcome::Changed);
        assert_eq!(state.nodes().len(), 3);
        let added = state.find_node("CCCCCCC").unwrap();
        assert_eq!(added.addresses, vec!["10.0.0.5:22000", "dynamic"]);
        assert!(!state.config_in_sync);
    }

    #[test]
    fn existing_node_identity_is_immutable() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        assert!(editor.open_node(&state, PEER));
        let draft = editor.node_mut().unwrap();
        draft.node.node_id = "ZZZZZZZ".to_string();
        draft.node.name = "carefully typed".to_string();

        assert!(matches!(
            editor.commit(&mut state),
            Err(ClientError::Rejected(_))
        ));
        assert!(state.find_node("ZZZZZZZ").is_none());
        assert!(state.config_in_sync);

        assert!(editor.is_open());
        let draft = editor.node_mut().unwrap();
        assert_eq!(draft.node.name, "carefully typed");
        draft.node.node_id = PEER.to_string();
        assert_eq!(editor.commit(&mut state).unwrap(), CommitOutcome::Changed);
        assert_eq!(
            state.find_node(PEER).map(|n| n.name.as_str()),
            Some("carefully typed")
        );
        assert!(!editor.is_open());
    }

    #[test]
    fn empty_folder_identity_keeps_session_open() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_new_folder();
        editor.folder_mut().unwrap().folder.directory = "/photos".to_string();

        assert!(editor.commit(&mut state).is_err());
        assert!(editor.is_open());
        assert_eq!(editor.folder_mut().unwrap().folder.directory, "/photos");
    }

    #[test]
    fn deleting_a_node_drops_it_from_folders() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_node(&state, PEER);

        assert_eq!(editor.delete(&mut state).unwrap(), CommitOutcome::Changed);
        assert!(state.find_node(PEER).is_none());
        assert!(!state.folders()[0].has_member(PEER));
        assert!(!state.config_in_sync);
    }

    #[test]
    fn local_node_cannot_be_deleted() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_node(&state, ME);
        assert!(editor.delete(&mut state).is_err());
        assert!(state.this_node().is_some());
        assert!(state.config_in_sync);
        assert!(editor.is_open());

        editor.open_settings(&state);
        assert!(editor.delete(&mut state).is_err());
        assert!(editor.settings_mut().is_some());
    }

    #[test]
    fn unsaved_node_delete_is_a_no_op() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_new_node();
        assert_eq!(editor.delete(&mut state).unwrap(), CommitOutcome::Unchanged);
        assert!(state.config_in_sync);
    }

    #[test]
    fn folder_commit_translates_simple_versioning() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_folder(&state, "default");
        let draft = editor.folder_mut().unwrap();
        assert!(!draft.simple_versioning);
        assert_eq!(draft.simple_keep, DEFAULT_SIMPLE_KEEP);
        draft.simple_versioning = true;
        draft.simple_keep = 3;

        assert_eq!(editor.commit(&mut state).unwrap(), CommitOutcome::Changed);
        let versioning = state.folders()[0].versioning.clone().unwrap();
        assert_eq!(versioning.kind, "simple");
        assert_eq!(versioning.params.get("keep").map(String::as_str), Some("3"));

        editor.open_folder(&state, "default");
        let draft = editor.folder_mut().unwrap();
        assert!(draft.simple_versioning);
        assert_eq!(draft.simple_keep, 3);
        draft.simple_versioning = false;
        editor.commit(&mut state).unwrap();
        assert!(state.folders()[0].versioning.is_none());
    }

    #[test]
    fn folder_commit_always_includes_local_node() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_new_folder();
        let draft = editor.folder_mut().unwrap();
        draft.folder.id = "photos".to_string();
        draft.folder.directory = "/photos".to_string();
        draft.select(PEER);

        editor.commit(&mut state).unwrap();
        let photos = state.find_folder("photos").unwrap();
        assert!(photos.has_member(ME));
        assert!(photos.has_member(PEER));

        editor.open_folder(&state, "photos");
        let draft = editor.folder_mut().unwrap();
        draft.deselect(ME);
        draft.deselect(PEER);
        editor.commit(&mut state).unwrap();
        let photos = state.find_folder("photos").unwrap();
        assert_eq!(photos.nodes, vec![FolderNode::new(ME)]);
    }

    #[test]
    fn reopening_and_committing_a_folder_unchanged_is_a_no_op() {
        let mut state = state();
        let mut editor = ConfigEditor::new();
        editor.open_folder(&state, "default");
        assert_eq!(editor.commit(&mut state).unwrap(), CommitOutcome::Unchanged);
        assert!(state.config_in_sync);
    }

    #[test]
    fn deleting_a_folder_drops_its_model() {
        let mut state = state();
        state
            .models
            .insert("default".to_string(), Default::default());
        let mut editor = ConfigEditor::new();
        editor.open_folder(&state, "default");

        assert_eq!(editor.delete(&mut state).unwrap(), CommitOutcome::Changed);
        assert!(state.folders().is_empty());
        assert!(state.models.is_empty());
    }

    #[test]
    fn opening_a_new_session_replaces_the_old_one() {
        let state = state();
        let mut editor = ConfigEditor::new();
        editor.open_settings(&state);
        editor.open_new_folder();
        assert!(editor.settings_mut().is_none());
        assert!(editor.folder_mut().is_some());
    }
}
