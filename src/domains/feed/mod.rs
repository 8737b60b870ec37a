#[allow(clippy::module_inception)]
pub mod feed;
pub mod subscription;

pub use feed::*;
pub use subscription::*;
