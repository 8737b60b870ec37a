pub mod frame;
pub mod geo;
pub mod mission;
pub mod ports;
pub mod target;

pub use frame::*;
pub use geo::*;
pub use mission::*;
pub use ports::*;
pub use target::*;
