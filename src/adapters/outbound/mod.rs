pub mod console_logger;
pub mod file_logger;
pub mod geojson_surface;
pub mod multi_logger;
pub mod noop_logger;
pub mod recording_surface;

pub use console_logger::*;
pub use file_logger::*;
pub use geojson_surface::*;
pub use multi_logger::*;
pub use noop_logger::*;
pub use recording_surface::*;
