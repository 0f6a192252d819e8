pub mod ports;
pub mod types;

pub use ports::*;
pub use types::*;
