pub mod swarm_service;
pub mod telemetry_pipeline;

pub use swarm_service::*;
pub use telemetry_pipeline::*;
