pub mod scheduler;
pub mod task;

pub use scheduler::*;
pub use task::*;
