use crate::domains::logger::{DomainLogger, FileLogger};
use std::sync::Arc;

/// Initialize the file logger and return a domain logger the coordinator can
/// be handed. `level` is a `log` level name (`info`, `debug`, ...). Console
/// output is left to whatever `tracing` subscriber is installed.
pub fn init_file_logger(path: &str, level: &str) -> Result<Arc<dyn DomainLogger>, String> {
    let level = level
        .parse::<log::LevelFilter>()
        .map_err(|e| format!("Invalid log level '{}': {}", level, e))?;
    FileLogger::init(path, level, false)
        .map_err(|e| format!("Failed to initialize fast_log: {}", e))?;
    Ok(Arc::new(FileLogger))
}
