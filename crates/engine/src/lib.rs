pub mod render;
pub mod stitch;
pub mod timeline;

pub use stitch::*;
pub use timeline::*;
