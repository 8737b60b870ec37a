//! Live mission tracking for food-donation deliveries: polls mission state,
//! works out where each volunteer is heading and keeps a map overlay in step.

pub mod adapters;
pub mod application;
pub mod common;
pub mod config;
pub mod domains;

pub use config::Config;

pub use common::*;
pub use domains::*;
