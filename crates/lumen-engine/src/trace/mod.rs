//! Compute-shader sphere ray tracer.
//!
//! - `scene`: materials, spheres and point lights as uploaded to the GPU
//! - `raygen`: primary ray directions and origins, generated once on the CPU
//! - `layout`: byte sizes, dispatch size and device-limit checks
//! - `tracer`: the GPU resources and the per-frame dispatch + draw
//!
//! Compute bindings (group 0): 0 output image, 1 directions, 2 positions,
//! 3 ray stack, 4 spheres, 5 point lights, 6 color stack, 7 params.

pub mod layout;
pub mod raygen;
pub mod scene;
mod tracer;

pub use layout::{TraceLayout, TraceParams};
pub use scene::{Material, PointLight, Scene, Sphere};
pub use tracer::{RayTracer, TraceError, TracerConfig, OUTPUT_FORMAT, PARAMS_BINDING};
