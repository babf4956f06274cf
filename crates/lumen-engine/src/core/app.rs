use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::device::Gpu;

use super::ctx::{FrameCtx, InitCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Lifecycle implemented by applications driven by [`crate::window::Runtime`].
///
/// Order: `init` once after the window and GPU exist, then `reshape` /
/// `on_window_event` / `update` while running, then `terminate` exactly once
/// before the GPU is torn down. `terminate` is skipped when `init` failed.
pub trait App {
    /// Creates GPU resources. An error aborts the runtime and is returned from
    /// `Runtime::run`.
    fn init(&mut self, ctx: &mut InitCtx<'_, '_>) -> Result<()>;

    /// Called after the drawable size changed. The surface is already reconfigured.
    fn reshape(&mut self, size: PhysicalSize<u32>) {
        let _ = size;
    }

    /// Called for window events before the runtime handles them.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw.
    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Releases everything `init` created.
    fn terminate(&mut self, gpu: &Gpu<'_>) {
        let _ = gpu;
    }
}
