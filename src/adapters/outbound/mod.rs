pub mod buffered_logger;
pub mod channel_telemetry;
pub mod console_logger;
pub mod file_logger;
pub mod multi_logger;
pub mod noop_logger;
pub mod sampled_optimizer;
pub mod simulated_flight_controller;
pub mod tracing_logger;
pub mod waypoint_files;

pub use buffered_logger::*;
pub use channel_telemetry::*;
pub use console_logger::*;
pub use file_logger::*;
pub use multi_logger::*;
pub use noop_logger::*;
pub use sampled_optimizer::*;
pub use simulated_flight_controller::*;
pub use tracing_logger::*;
pub use waypoint_files::*;
