//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and the application: the
//! `App` lifecycle and the contexts handed to each callback.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, InitCtx, WindowCtx};
