pub mod feed;
pub mod logger;
pub mod overlay;
pub mod tracking;

pub use feed::*;
pub use logger::*;
pub use overlay::*;
pub use tracking::*;
