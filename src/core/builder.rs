use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{config::SupervisorConfig, supervisor::Supervisor};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    shutdown: Option<CancellationToken>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            shutdown: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (generation lifecycle, child exits, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses an externally owned token as the shutdown flag.
    ///
    /// Without it the supervisor creates its own; see [`Supervisor::shutdown_token`].
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Builds the supervisor.
    ///
    /// Spawns the subscriber workers, so it must be called inside a Tokio runtime.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let shutdown = self.shutdown.unwrap_or_default();
        Supervisor::new_internal(self.cfg, bus, subs, shutdown)
    }
}
