//! GPU rendering subsystem.
//!
//! - `shader`: WGSL sources (embedded or from a directory) and compilation
//! - `display`: the full-screen quad that puts a texture on the surface
//!
//! Each owner is responsible for its own GPU resources and registers them with
//! the device's `ResourceLedger`.

mod ctx;
pub mod display;
pub mod shader;

pub use ctx::{RenderCtx, RenderTarget};
pub use display::DisplayPipeline;
pub use shader::{ShaderError, ShaderSet, ShaderSource};
