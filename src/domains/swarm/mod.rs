pub mod actors;
pub mod coordinator;
pub mod events;
pub mod ports;
pub mod projections;
pub mod state;

pub use actors::*;
pub use coordinator::*;
pub use events::*;
pub use ports::*;
pub use projections::*;
pub use state::*;
