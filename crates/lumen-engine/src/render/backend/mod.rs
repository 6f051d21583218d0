//! Graphics backend abstraction.
//!
//! The renderer drives the GPU exclusively through [`GraphicsBackend`]. The
//! concrete backend is chosen once, when the renderer is built, and kept
//! behind the trait for the renderer's lifetime.
//!
//! Resources live in backend-owned arenas and are referred to by small
//! `Copy` handles; callers never own GPU objects directly.

mod recording;
mod slots;
mod wgpu_backend;

pub use self::recording::{BackendCommand, CommandLog, RecordingBackend};
pub use self::wgpu_backend::WgpuBackend;
pub(crate) use slots::Slots;

use super::{BlendMode, RenderError, TextureArrayDesc};

/// Handle to a vertex, index or uniform buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

/// Handle to an uploaded texture array.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureArrayId(pub(crate) u32);

/// Handle to an offscreen render target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub(crate) u32);

/// Destination of draw calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The presentation surface.
    Backbuffer,
    /// The multisample color target (exists only while MSAA is configured).
    Multisample,
    Framebuffer(FramebufferId),
}

/// Which batch pipeline a draw uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// RGBA texture array sampled and multiplied by tint.
    Quad,
    /// Coverage (R8) texture array used as alpha for the tint.
    Text,
}

/// One indexed draw of a flushed batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchDraw {
    pub kind: BatchKind,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub camera: BufferId,
    pub textures: TextureArrayId,
    pub index_count: u32,
}

/// Shader applied when a framebuffer is sampled into the next target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostEffect {
    Passthrough,
    Grayscale,
    Invert,
    /// WGSL defining `fn effect(color: vec4<f32>, uv: vec2<f32>) -> vec4<f32>`.
    ///
    /// The function may also sample `source_texture` with `source_sampler`.
    Custom(String),
}

impl PostEffect {
    pub(crate) fn wgsl(&self) -> &str {
        match self {
            PostEffect::Passthrough => {
                "fn effect(color: vec4<f32>, uv: vec2<f32>) -> vec4<f32> { return color; }"
            }
            PostEffect::Grayscale => {
                "fn effect(color: vec4<f32>, uv: vec2<f32>) -> vec4<f32> {
                    let l = dot(color.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
                    return vec4<f32>(l, l, l, color.a);
                }"
            }
            PostEffect::Invert => {
                "fn effect(color: vec4<f32>, uv: vec2<f32>) -> vec4<f32> {
                    return vec4<f32>(vec3<f32>(1.0) - color.rgb, color.a);
                }"
            }
            PostEffect::Custom(src) => src,
        }
    }
}

/// Capability set the renderer needs from a native graphics API.
///
/// Calls arrive in frame order from a single thread:
/// `acquire_frame` → (`bind_target` / `write_buffer` / `draw_batch` /
/// `resolve_multisample` / `draw_fullscreen`)* → `present`.
pub trait GraphicsBackend {
    /// Drawable size in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    fn create_vertex_buffer(&mut self, label: &str, size_bytes: u64) -> BufferId;

    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> BufferId;

    fn create_uniform_buffer(&mut self, label: &str, size_bytes: u64) -> BufferId;

    /// Uploads `bytes` at the start of `buffer`. This is the unmap step of a
    /// vertex sink: the data becomes visible to subsequent draws, while draws
    /// already issued in the frame keep seeing the previous contents.
    fn write_buffer(&mut self, buffer: BufferId, bytes: &[u8]);

    fn create_texture_array(
        &mut self,
        desc: &TextureArrayDesc<'_>,
    ) -> Result<TextureArrayId, RenderError>;

    /// Creates a surface-sized offscreen target whose color output is
    /// sampled through `effect`.
    fn create_framebuffer(&mut self, label: &str, effect: &PostEffect) -> FramebufferId;

    fn destroy_framebuffer(&mut self, id: FramebufferId) -> Result<(), RenderError>;

    /// (Re)creates the multisample target, or drops it for `None`.
    fn configure_multisample(&mut self, sample_count: Option<u32>) -> Result<(), RenderError>;

    fn set_blend_mode(&mut self, blend: BlendMode);

    fn set_clear_color(&mut self, color: crate::paint::Color);

    /// Acquires the presentation surface for a new frame.
    fn acquire_frame(&mut self) -> Result<(), RenderError>;

    /// Makes `target` the destination of following draws and clears it.
    fn bind_target(&mut self, target: RenderTarget);

    fn draw_batch(&mut self, draw: &BatchDraw);

    /// Draws a full-screen quad into the bound target, sampling `source`'s
    /// color output through its post effect.
    fn draw_fullscreen(&mut self, source: FramebufferId);

    /// Resolves the multisample target into `destination`.
    fn resolve_multisample(&mut self, destination: RenderTarget);

    /// Submits recorded work and presents the surface.
    fn present(&mut self);

    /// Resizes the surface and every surface-sized target.
    fn resize(&mut self, width: u32, height: u32);
}
