mod api_types;
mod backend;
mod client;
mod queries;

pub use api_types::{
    Config, ConfigSyncResponse, ConnectionsResponse, ErrorEntry, FolderConfig, FolderModel,
    FolderNode, GuiConfig, NodeConfig, OptionsConfig, RawConnection, SystemInfo, Versioning,
    short_node_id,
};
pub use backend::{Backend, Scheme};
pub use client::RestClient;
