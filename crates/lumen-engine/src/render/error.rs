use thiserror::Error;

use super::backend::FramebufferId;

/// Errors surfaced by renderer operations.
///
/// Capacity overflow is deliberately absent: it is recovered internally by
/// flushing the affected batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("framebuffer {0:?} is already in the chain")]
    FramebufferAlreadyInChain(FramebufferId),

    #[error("framebuffer {0:?} is not in the chain")]
    FramebufferNotInChain(FramebufferId),

    #[error("framebuffer {0:?} does not exist")]
    UnknownFramebuffer(FramebufferId),

    #[error("invalid texture array: {0}")]
    InvalidTextureArray(String),

    #[error("adapter does not support {0}x multisampling for the surface format")]
    UnsupportedSampleCount(u32),

    #[error("surface frame unavailable; skipping")]
    FrameSkipped,

    #[error("surface lost irrecoverably")]
    SurfaceLost,
}

/// Errors reported by a [`VertexSink`](super::VertexSink) write.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    #[error("vertex sink is not mapped (write outside begin_layer/end_layer)")]
    Unmapped,

    #[error("vertex sink is full ({capacity} vertices)")]
    Full { capacity: usize },
}
