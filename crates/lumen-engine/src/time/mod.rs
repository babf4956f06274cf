//! Time subsystem.
//!
//! One `FrameClock` per window; call `tick()` once per presented frame.

mod frame_clock;

pub use frame_clock::{FpsCounter, FrameClock, FrameTime};
