pub mod tracking_engine;
pub mod tracking_session;

pub use tracking_engine::*;
pub use tracking_session::*;
