use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Fans every message out to each attached DomainLogger, in order.
/// Lets the coordinator write to file and console without changing the port.
pub struct MultiLogger {
    sinks: Vec<Arc<dyn DomainLogger>>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<Arc<dyn DomainLogger>>) -> Self {
        Self { sinks }
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.info(msg));
    }

    fn warn(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.warn(msg));
    }

    fn error(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.error(msg));
    }

    fn debug(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.debug(msg));
    }
}

/// File logger plus a tracing bridge. Falls back to tracing alone when the
/// file logger cannot be initialized.
pub fn init_combined_logger(path: &str, level: &str, swarm_id: &str) -> Arc<dyn DomainLogger> {
    let tracing_bridge = crate::adapters::outbound::init_tracing_logger(swarm_id);
    match crate::adapters::outbound::file_logger::init_file_logger(path, level) {
        Ok(file_logger) => Arc::new(MultiLogger::new(vec![file_logger, tracing_bridge])),
        Err(e) => {
            tracing::warn!("File logger unavailable ({}); logging through tracing only", e);
            tracing_bridge
        }
    }
}
