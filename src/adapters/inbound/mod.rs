pub mod file_telemetry_store;
pub mod memory_telemetry_store;

pub use file_telemetry_store::*;
pub use memory_telemetry_store::*;
