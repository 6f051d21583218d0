//! Device and window-surface management.
//!
//! Creates the wgpu device for the requested [`GraphicsApi`], keeps the
//! surface configured across resizes, and hands out one [`GpuFrame`] per
//! rendered frame.

mod context;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use frame::{AcquireError, GpuFrame};
pub use init::{GpuInit, GraphicsApi};
