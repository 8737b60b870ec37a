pub mod keys;
pub mod reconciler;
pub mod scene;
pub mod surface;
pub mod variant;

pub use keys::*;
pub use reconciler::*;
pub use scene::*;
pub use surface::*;
pub use variant::*;
