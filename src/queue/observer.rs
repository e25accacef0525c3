//! Observer installed by the queue on every procedure it accepts.

use std::sync::Weak;

use tracing::debug;

use crate::observers::Observer;
use crate::procedure::{Procedure, State};
use crate::queue::Shared;

/// Enqueues produced procedures on the producer's queue.
pub(crate) struct QueueObserver {
    pub(crate) queue: Weak<Shared>,
}

impl Observer for QueueObserver {
    fn on_produce(&self, procedure: &Procedure, produced: &Procedure) {
        let Some(queue) = self.queue.upgrade() else {
            return;
        };
        if produced.state() != State::Initialized {
            debug!(producer = %procedure, produced = %produced, "produced procedure already enqueued");
            return;
        }
        if let Err(err) = queue.add(produced.clone()) {
            debug!(producer = %procedure, produced = %produced, error = %err, "produced procedure rejected");
        }
    }
}
