use thiserror::Error;

/// The backbuffer texture and command encoder for one frame.
///
/// Holding the surface texture blocks acquisition of the next one, so a frame
/// is submitted (or dropped) before the following `acquire_frame`.
pub struct GpuFrame {
    pub(crate) surface_texture: wgpu::SurfaceTexture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) encoder: wgpu::CommandEncoder,
}

impl GpuFrame {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn encoder_mut(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }
}

/// Why no backbuffer could be acquired.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Try again next frame; the surface may have been reconfigured.
    #[error("frame skipped: {0}")]
    Skipped(wgpu::SurfaceError),
    /// The surface cannot be recovered.
    #[error("surface unrecoverable: {0}")]
    Fatal(wgpu::SurfaceError),
}
