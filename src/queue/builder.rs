use std::sync::Arc;

use tokio::runtime::Handle;

use crate::events::Bus;
use crate::exclusivity::ExclusivityManager;
use crate::queue::{ProcedureQueue, QueueConfig, Shared};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`ProcedureQueue`] with optional features.
pub struct QueueBuilder {
    cfg: QueueConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    exclusivity: Option<Arc<ExclusivityManager>>,
    runtime: Option<Handle>,
}

impl QueueBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            exclusivity: None,
            runtime: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive every lifecycle event of the queue through
    /// dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses `manager` for mutual exclusion instead of
    /// [`ExclusivityManager::global`].
    pub fn with_exclusivity(mut self, manager: Arc<ExclusivityManager>) -> Self {
        self.exclusivity = Some(manager);
        self
    }

    /// Runs procedures on `runtime` instead of the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the queue.
    ///
    /// # Panics
    /// If no runtime was given and this is called outside a tokio runtime.
    pub fn build(self) -> ProcedureQueue {
        let runtime = self.runtime.unwrap_or_else(Handle::current);
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let exclusivity = self
            .exclusivity
            .unwrap_or_else(ExclusivityManager::global);

        let shared = Shared::new(self.cfg, bus.clone(), runtime.clone(), exclusivity);
        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus, &runtime);
            shared.subscriber_listener(set);
        }
        ProcedureQueue { shared }
    }
}
