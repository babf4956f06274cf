//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//! - tracking GPU object lifetimes (`ledger`)

mod error;
mod frame;
mod gpu;
mod init;
pub mod ledger;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use ledger::{GpuRelease, LedgerReport, ResourceKind, ResourceLedger, Tracked};
