/// Reachability of the daemon as seen by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Healthy,
    Unreachable,
    /// A restart or shutdown was requested; failures are expected until the
    /// daemon answers again.
    Restarting { shutdown: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    /// Healthy → Unreachable.
    Lost,
    /// Unreachable → Healthy. Local state must be reloaded.
    Recovered,
    /// Restarting → Healthy. Local state must be reloaded.
    Restarted,
}

impl Transition {
    pub fn needs_reload(self) -> bool {
        matches!(self, Transition::Recovered | Transition::Restarted)
    }
}

impl LinkState {
    pub fn on_success(&mut self) -> Transition {
        let transition = match self {
            LinkState::Healthy => Transition::None,
            LinkState::Unreachable => Transition::Recovered,
            LinkState::Restarting { .. } => Transition::Restarted,
        };
        *self = LinkState::Healthy;
        transition
    }

    pub fn on_failure(&mut self) -> Transition {
        match self {
            LinkState::Healthy => {
                *self = LinkState::Unreachable;
                Transition::Lost
            }
            LinkState::Unreachable | LinkState::Restarting { .. } => Transition::None,
        }
    }

    pub fn begin_restart(&mut self) {
        *self = LinkState::Restarting { shutdown: false };
    }

    pub fn begin_shutdown(&mut self) {
        *self = LinkState::Restarting { shutdown: true };
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, LinkState::Unreachable)
    }

    pub fn is_restarting(&self) -> bool {
        matches!(self, LinkState::Restarting { .. })
    }

    pub fn is_shut_down(&self) -> bool {
        matches!(self, LinkState::Restarting { shutdown: true })
    }
}
