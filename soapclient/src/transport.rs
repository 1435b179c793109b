//! Shared HTTP transport: one pooled agent, rebuilt on timeout changes.

use std::sync::RwLock;
use std::time::Duration;

use ureq::Agent;

pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct HttpTransport {
    agent: RwLock<Agent>,
}

impl HttpTransport {
    pub(crate) fn new(connect_timeout: Duration) -> Self {
        Self {
            agent: RwLock::new(build_agent(connect_timeout)),
        }
    }

    /// Agent snapshot for one call. In-flight calls keep the clone they
    /// started with; a timeout change only affects later calls.
    pub(crate) fn agent(&self) -> Agent {
        self.agent.read().unwrap().clone()
    }

    pub(crate) fn set_connect_timeout(&self, timeout: Duration) {
        *self.agent.write().unwrap() = build_agent(timeout);
    }
}

fn build_agent(connect_timeout: Duration) -> Agent {
    // Non-200 statuses must still hand us their body: the fault path
    // parses it.
    let config = Agent::config_builder()
        .http_status_as_error(false)
        .timeout_connect(Some(connect_timeout))
        .build();

    config.into()
}
