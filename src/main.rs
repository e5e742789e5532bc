use std::sync::Arc;

use syncthing_console::controller::Step;
use syncthing_console::{ClientError, Controller, RestClient, SessionState, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = Settings::load().await;
    let client = RestClient::new(&settings)?;
    info!(url = %client.base_url(), "Connecting to daemon");

    let mut controller = Controller::new(Arc::new(client), settings.poll_interval());
    controller.initial_load().await;

    loop {
        if controller.step().await == Step::Polled {
            log_summary(controller.state());
        }
    }
}

fn log_summary(state: &SessionState) {
    let connected = state
        .other_nodes()
        .filter(|n| state.connections.contains_key(&n.node_id))
        .count();
    info!(
        version = state.version.as_deref().unwrap_or("unknown"),
        folders = state.folders().len(),
        nodes = state.other_nodes().count(),
        connected,
        in_sync = state.config_in_sync,
        unseen_errors = state.unseen_errors().count(),
        "Tick"
    );
}
