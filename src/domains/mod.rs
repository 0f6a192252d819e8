pub mod agent;
pub mod logger;
pub mod planning;
pub mod swarm;
pub mod trajectory;

pub use agent::*;
pub use logger::*;
pub use planning::*;
pub use swarm::*;
pub use trajectory::*;
