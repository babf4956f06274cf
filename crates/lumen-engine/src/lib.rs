//! Lumen engine crate.
//!
//! Platform + GPU runtime for the compute-shader ray tracer demo: window and
//! event loop, wgpu device and surface, the application lifecycle, and the
//! tracer itself.

pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod time;
pub mod trace;
pub mod window;
