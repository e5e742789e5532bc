//! Poll loop, link supervision and the write side of the console.
//!
//! Every request runs in its own task and reports back through an unbounded
//! channel. Only the controller applies those reports, so the session state
//! has a single writer and needs no locking. Ticks are driven by a fixed
//! interval and never wait for the previous tick's responses.

mod completion;
mod link;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::editor::{CommitOutcome, ConfigEditor};
use crate::rest::{Backend, Scheme};
use crate::sampler::ConnectionSampler;
use crate::session::SessionState;
use crate::types::ClientError;

pub use completion::{Completion, WriteAction};
pub use link::{LinkState, Transition};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Time the daemon gets to rebind its GUI listener on the new scheme.
pub const PROTOCOL_SWITCH_DELAY: Duration = Duration::from_secs(1);

/// What a call to [`Controller::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Polled,
    Applied,
}

pub struct Controller<B: Backend> {
    backend: Arc<B>,
    state: SessionState,
    editor: ConfigEditor,
    link: LinkState,
    sampler: ConnectionSampler,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    poll_interval: Duration,
    ticker: Option<Interval>,
    /// Bumped on every local config mutation; stale sync reads are dropped.
    config_generation: u64,
    reload_in_flight: bool,
}

impl<B: Backend> Controller<B> {
    pub fn new(backend: Arc<B>, poll_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let poll_interval = if poll_interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            poll_interval
        };
        Self {
            backend,
            state: SessionState::new(),
            editor: ConfigEditor::new(),
            link: LinkState::default(),
            sampler: ConnectionSampler::new(),
            tx,
            rx,
            poll_interval,
            ticker: None,
            config_generation: 0,
            reload_in_flight: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn editor(&self) -> &ConfigEditor {
        &self.editor
    }

    /// Mutable access to the open working copy (`settings_mut`, `node_mut`,
    /// `folder_mut`).
    pub fn editor_mut(&mut self) -> &mut ConfigEditor {
        &mut self.editor
    }

    /// Fetch version, system, config and sync status in order, then poll once.
    /// Returns after the poll has been issued.
    pub async fn initial_load(&mut self) {
        self.spawn_reload();
        while let Some(completion) = self.rx.recv().await {
            let finished = matches!(completion, Completion::LoadFinished);
            self.apply(completion);
            if finished {
                break;
            }
        }
        self.poll();
    }

    /// Drive the poll timer and apply completions forever.
    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// Wait for the next tick or completion and handle it.
    pub async fn step(&mut self) -> Step {
        let period = self.poll_interval;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let completion = tokio::select! {
            _ = ticker.tick() => None,
            completion = self.rx.recv() => completion,
        };

        match completion {
            Some(completion) => {
                self.apply(completion);
                Step::Applied
            }
            None => {
                self.poll();
                Step::Polled
            }
        }
    }

    /// Issue one round of independent reads.
    pub fn poll(&self) {
        self.spawn(|backend| async move { Completion::System(backend.system().await) });

        for folder in &self.state.config.folders {
            let folder_id = folder.id.clone();
            self.spawn(move |backend| async move {
                let result = backend.model(&folder_id).await;
                Completion::Model { folder_id, result }
            });
        }

        self.spawn(|backend| async move {
            let result = backend.connections().await;
            Completion::Connections {
                result,
                received_at: Utc::now(),
            }
        });

        self.spawn(|backend| async move { Completion::Errors(backend.errors().await) });

        let generation = self.config_generation;
        self.spawn(move |backend| async move {
            Completion::ConfigSync {
                generation,
                result: backend.config_in_sync().await,
            }
        });
    }

    /// Merge one completion into the session state.
    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Version(result) => {
                if let Some(version) = self.read_result("version", result) {
                    match crate::session::parse_daemon_version(&version) {
                        Some(parsed) => debug!(version = %parsed, "Daemon version"),
                        None => debug!(version = %version, "Daemon version is not semver"),
                    }
                    self.state.version = Some(version);
                }
            }
            Completion::System(result) => {
                if let Some(system) = self.read_result("system", result) {
                    if self.state.my_id != system.my_id {
                        info!(my_id = %system.my_id, "Local node identity");
                        self.state.my_id = system.my_id.clone();
                    }
                    self.state.system = Some(system);
                }
            }
            Completion::Config(result) => {
                if let Some(config) = self.read_result("config", result) {
                    debug!(
                        nodes = config.nodes.len(),
                        folders = config.folders.len(),
                        "Loaded config"
                    );
                    self.state.load_config(config);
                }
            }
            Completion::ConfigSync { generation, result } => {
                if let Some(in_sync) = self.read_result("config/sync", result) {
                    if generation < self.config_generation {
                        debug!(
                            generation,
                            current = self.config_generation,
                            "Dropping stale sync status"
                        );
                    } else {
                        self.state.config_in_sync = in_sync;
                    }
                }
            }
            Completion::Model { folder_id, result } => {
                if let Some(model) = self.read_result("model", result) {
                    if self.state.find_folder(&folder_id).is_some() {
                        self.state.models.insert(folder_id, model);
                    }
                }
            }
            Completion::Connections {
                result,
                received_at,
            } => {
                if let Some(raw) = self.read_result("connections", result) {
                    self.state.connections = self.sampler.sample(raw, received_at);
                }
            }
            Completion::Errors(result) => {
                if let Some(errors) = self.read_result("errors", result) {
                    self.state.errors = errors;
                }
            }
            Completion::Written { action, result } => match result {
                Ok(()) => debug!(action = action.as_str(), "Write accepted"),
                Err(err) => {
                    warn!(action = action.as_str(), error = ?err, "Write failed");
                    self.on_failure();
                }
            },
            Completion::LoadFinished => self.reload_in_flight = false,
            Completion::SwitchProtocol(scheme) => {
                info!(%scheme, "Switching GUI protocol");
                self.backend.switch_scheme(scheme);
            }
        }
    }

    pub fn open_settings(&mut self) {
        self.editor.open_settings(&self.state);
    }

    pub fn open_node(&mut self, node_id: &str) -> bool {
        self.editor.open_node(&self.state, node_id)
    }

    pub fn open_new_node(&mut self) {
        self.editor.open_new_node();
    }

    pub fn open_folder(&mut self, folder_id: &str) -> bool {
        self.editor.open_folder(&self.state, folder_id)
    }

    pub fn open_new_folder(&mut self) {
        self.editor.open_new_folder();
    }

    pub fn discard(&mut self) {
        self.editor.discard();
    }

    /// Apply the open working copy locally and, if it changed anything, send
    /// the full config.
    pub fn commit(&mut self) -> Result<CommitOutcome, ClientError> {
        let outcome = self.editor.commit(&mut self.state)?;
        if outcome == CommitOutcome::Changed {
            self.push_config();
        }
        Ok(outcome)
    }

    /// Delete the node or folder of the open working copy.
    pub fn delete(&mut self) -> Result<CommitOutcome, ClientError> {
        let outcome = self.editor.delete(&mut self.state)?;
        if outcome == CommitOutcome::Changed {
            self.push_config();
        }
        Ok(outcome)
    }

    pub fn restart(&mut self) {
        info!("Restarting daemon");
        self.link.begin_restart();
        self.config_generation += 1;
        self.state.config_in_sync = true;
        self.spawn(|backend| async move {
            Completion::Written {
                action: WriteAction::Restart,
                result: backend.restart().await,
            }
        });

        if self.state.protocol_changed {
            self.state.protocol_changed = false;
            let scheme = Scheme::for_tls(self.state.config.gui.use_tls);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                time::sleep(PROTOCOL_SWITCH_DELAY).await;
                let _ = tx.send(Completion::SwitchProtocol(scheme));
            });
        }
    }

    pub fn shutdown(&mut self) {
        info!("Shutting down daemon");
        self.link.begin_shutdown();
        self.config_generation += 1;
        self.state.config_in_sync = true;
        self.spawn(|backend| async move {
            Completion::Written {
                action: WriteAction::Shutdown,
                result: backend.shutdown().await,
            }
        });
    }

    /// Mark every current error as seen and ask the daemon to drop them.
    pub fn clear_errors(&mut self) {
        let Some(last) = self.state.errors.last() else {
            return;
        };
        self.state.seen_error = Some(last.time);
        self.spawn(|backend| async move {
            Completion::Written {
                action: WriteAction::ClearErrors,
                result: backend.clear_errors().await,
            }
        });
    }

    fn push_config(&mut self) {
        self.config_generation += 1;
        let snapshot = self.state.config.clone();
        debug!(generation = self.config_generation, "Sending config");
        self.spawn(move |backend| async move {
            Completion::Written {
                action: WriteAction::Config,
                result: backend.post_config(&snapshot).await,
            }
        });
    }

    fn spawn_reload(&mut self) {
        if self.reload_in_flight {
            return;
        }
        self.reload_in_flight = true;
        let generation = self.config_generation;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Completion::Version(backend.version().await));
            let _ = tx.send(Completion::System(backend.system().await));
            let _ = tx.send(Completion::Config(backend.config().await));
            let _ = tx.send(Completion::ConfigSync {
                generation,
                result: backend.config_in_sync().await,
            });
            let _ = tx.send(Completion::LoadFinished);
        });
    }

    fn spawn<F, Fut>(&self, request: F)
    where
        F: FnOnce(Arc<B>) -> Fut,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        let fut = request(Arc::clone(&self.backend));
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    fn read_result<T>(&mut self, resource: &str, result: Result<T, ClientError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.on_success();
                Some(value)
            }
            Err(err) => {
                if self.link.is_restarting() {
                    debug!(resource, error = ?err, "Read failed while restarting");
                } else {
                    warn!(resource, error = ?err, "Read failed");
                }
                self.on_failure();
                None
            }
        }
    }

    fn on_success(&mut self) {
        let transition = self.link.on_success();
        match transition {
            Transition::Recovered => info!("Daemon reachable again, reloading"),
            Transition::Restarted => {
                info!("Daemon is back after restart, reloading");
                self.sampler.reset();
            }
            Transition::None | Transition::Lost => {}
        }
        if transition.needs_reload() {
            self.spawn_reload();
        }
    }

    fn on_failure(&mut self) {
        if self.link.on_failure() == Transition::Lost {
            warn!("Daemon unreachable");
        }
    }
}
