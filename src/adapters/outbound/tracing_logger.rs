use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Forwards domain log lines into `tracing`, tagged with the swarm id.
struct TracingBridge {
    swarm_id: String,
}

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(swarm = %self.swarm_id, "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(swarm = %self.swarm_id, "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(swarm = %self.swarm_id, "{}", msg);
    }

    fn debug(&self, msg: &str) {
        tracing::debug!(swarm = %self.swarm_id, "{}", msg);
    }
}

pub fn init_tracing_logger(swarm_id: &str) -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge {
        swarm_id: swarm_id.to_string(),
    })
}
