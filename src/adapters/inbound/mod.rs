pub mod file_mission_source;
pub mod memory_mission_source;
pub mod simulated_source;

pub use file_mission_source::*;
pub use memory_mission_source::*;
pub use simulated_source::*;
