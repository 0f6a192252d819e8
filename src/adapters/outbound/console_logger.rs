use crate::domains::logger::DomainLogger;
use std::sync::Arc;

struct ConsoleBridge {
    verbose: bool,
}

impl DomainLogger for ConsoleBridge {
    fn info(&self, msg: &str) { println!("{}", msg); }
    fn warn(&self, msg: &str) { println!("WARN: {}", msg); }
    fn error(&self, msg: &str) { eprintln!("ERROR: {}", msg); }

    fn debug(&self, msg: &str) {
        if self.verbose {
            println!("DEBUG: {}", msg);
        }
    }
}

/// Initialize a simple console-backed DomainLogger (useful as a fallback).
/// `verbose` also prints per-tick debug lines.
pub fn init_console_logger(verbose: bool) -> Arc<dyn DomainLogger> {
    Arc::new(ConsoleBridge { verbose })
}
