//! Batched 2D rendering.
//!
//! [`Renderer`] is the entry point: it owns a [`QuadBatch`], a [`TextBatch`]
//! and a [`FrameCompositor`] on top of a [`backend::GraphicsBackend`].

pub mod backend;

mod batch;
mod camera;
mod compositor;
mod config;
mod error;
mod quad;
mod renderer;
mod sink;
mod text;
mod texture;
mod vertex;

pub use self::backend::{
    BatchKind, BufferId, FramebufferId, GraphicsBackend, PostEffect, RenderTarget, TextureArrayId,
};
pub use self::camera::Camera;
pub use self::compositor::FrameCompositor;
pub use self::config::{validate_sample_count, BlendMode, MsaaConfig, RendererConfig, MAX_MSAA_SAMPLES};
pub use self::error::{RenderError, SinkError};
pub use self::quad::{quad_corners, QuadBatch};
pub use self::renderer::{Renderer, RendererStats};
pub use self::sink::VertexSink;
pub use self::text::{measure_advance, GlyphMetrics, GlyphSource, TextBatch};
pub use self::texture::{TextureArray, TextureArrayDesc, TextureArrayFormat, TextureCoordinates};
pub use self::vertex::{quad_indices, BatchVertex, CameraUniform, INDICES_PER_QUAD, VERTICES_PER_QUAD};
