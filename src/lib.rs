//! Client-side state controller for a Syncthing daemon console.
//!
//! [`Controller`] polls the daemon's REST API, derives display metrics,
//! tracks reachability across outages and restarts, and pushes optimistic
//! config edits back to the daemon.

pub mod config;
pub mod controller;
pub mod editor;
pub mod metrics;
pub mod reconcile;
pub mod rest;
pub mod sampler;
pub mod session;
pub mod types;

pub use config::Config as Settings;
pub use controller::{Controller, LinkState};
pub use editor::{CommitOutcome, ConfigEditor, WorkingCopy};
pub use rest::{Backend, RestClient, Scheme};
pub use session::SessionState;
pub use types::ClientError;
