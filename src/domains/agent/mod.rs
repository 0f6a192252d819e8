pub mod ports;
pub mod proxy;

pub use ports::*;
pub use proxy::*;
