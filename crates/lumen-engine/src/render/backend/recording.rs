//! Headless backend that records commands instead of touching a GPU.
//!
//! Used by tests and by tooling that wants to inspect the exact command
//! stream a frame produces.

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::paint::Color;
use crate::render::vertex::BatchVertex;
use crate::render::{BlendMode, RenderError, TextureArrayDesc};

use super::{
    BatchDraw, BufferId, FramebufferId, GraphicsBackend, PostEffect, RenderTarget, TextureArrayId,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    CreateBuffer { id: BufferId, label: String, size_bytes: u64 },
    WriteBuffer { buffer: BufferId, bytes: Vec<u8> },
    CreateTextureArray { id: TextureArrayId, layers: u32 },
    CreateFramebuffer { id: FramebufferId, effect: PostEffect },
    DestroyFramebuffer { id: FramebufferId },
    ConfigureMultisample { sample_count: Option<u32> },
    SetBlendMode(BlendMode),
    SetClearColor(Color),
    AcquireFrame,
    BindTarget(RenderTarget),
    DrawBatch(BatchDraw),
    DrawFullscreen { source: FramebufferId, target: RenderTarget },
    ResolveMultisample { destination: RenderTarget },
    Present,
    Resize { width: u32, height: u32 },
}

/// Shared view of the commands a [`RecordingBackend`] has seen.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    inner: Rc<RefCell<Vec<BackendCommand>>>,
}

impl CommandLog {
    pub fn commands(&self) -> Ref<'_, Vec<BackendCommand>> {
        self.inner.borrow()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn batch_draws(&self) -> Vec<BatchDraw> {
        self.inner
            .borrow()
            .iter()
            .filter_map(|c| match c {
                BackendCommand::DrawBatch(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    /// `(source, target)` of every full-screen draw, in order.
    pub fn fullscreen_draws(&self) -> Vec<(FramebufferId, RenderTarget)> {
        self.inner
            .borrow()
            .iter()
            .filter_map(|c| match c {
                BackendCommand::DrawFullscreen { source, target } => Some((*source, *target)),
                _ => None,
            })
            .collect()
    }

    pub fn bound_targets(&self) -> Vec<RenderTarget> {
        self.inner
            .borrow()
            .iter()
            .filter_map(|c| match c {
                BackendCommand::BindTarget(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Vertices of the most recent upload into `buffer`.
    pub fn last_vertices(&self, buffer: BufferId) -> Vec<BatchVertex> {
        self.inner
            .borrow()
            .iter()
            .rev()
            .find_map(|c| match c {
                BackendCommand::WriteBuffer { buffer: b, bytes } if *b == buffer => {
                    Some(bytemuck::pod_collect_to_vec::<u8, BatchVertex>(bytes))
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    fn push(&self, command: BackendCommand) {
        self.inner.borrow_mut().push(command);
    }
}

/// [`GraphicsBackend`] that only records.
pub struct RecordingBackend {
    log: CommandLog,
    size: (u32, u32),
    next_buffer: u32,
    next_texture: u32,
    next_framebuffer: u32,
    live_framebuffers: HashSet<FramebufferId>,
    bound: RenderTarget,
    max_samples: u32,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> (Self, CommandLog) {
        let log = CommandLog::default();
        let backend = Self {
            log: log.clone(),
            size: (width, height),
            next_buffer: 0,
            next_texture: 0,
            next_framebuffer: 0,
            live_framebuffers: HashSet::new(),
            bound: RenderTarget::Backbuffer,
            max_samples: 16,
        };
        (backend, log)
    }

    /// Makes `configure_multisample` reject sample counts above `max`, the
    /// way an adapter with fewer MSAA modes would.
    pub fn with_max_samples(mut self, max: u32) -> Self {
        self.max_samples = max;
        self
    }

    fn create_buffer(&mut self, label: &str, size_bytes: u64) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.log.push(BackendCommand::CreateBuffer {
            id,
            label: label.to_owned(),
            size_bytes,
        });
        id
    }
}

impl GraphicsBackend for RecordingBackend {
    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn create_vertex_buffer(&mut self, label: &str, size_bytes: u64) -> BufferId {
        self.create_buffer(label, size_bytes)
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> BufferId {
        let id = self.create_buffer(label, std::mem::size_of_val(indices) as u64);
        self.log.push(BackendCommand::WriteBuffer {
            buffer: id,
            bytes: bytemuck::cast_slice(indices).to_vec(),
        });
        id
    }

    fn create_uniform_buffer(&mut self, label: &str, size_bytes: u64) -> BufferId {
        self.create_buffer(label, size_bytes)
    }

    fn write_buffer(&mut self, buffer: BufferId, bytes: &[u8]) {
        self.log.push(BackendCommand::WriteBuffer {
            buffer,
            bytes: bytes.to_vec(),
        });
    }

    fn create_texture_array(
        &mut self,
        desc: &TextureArrayDesc<'_>,
    ) -> Result<TextureArrayId, RenderError> {
        desc.validate().map_err(RenderError::InvalidTextureArray)?;
        let id = TextureArrayId(self.next_texture);
        self.next_texture += 1;
        self.log.push(BackendCommand::CreateTextureArray {
            id,
            layers: desc.layers.len() as u32,
        });
        Ok(id)
    }

    fn create_framebuffer(&mut self, _label: &str, effect: &PostEffect) -> FramebufferId {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.live_framebuffers.insert(id);
        self.log.push(BackendCommand::CreateFramebuffer {
            id,
            effect: effect.clone(),
        });
        id
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) -> Result<(), RenderError> {
        if !self.live_framebuffers.remove(&id) {
            return Err(RenderError::UnknownFramebuffer(id));
        }
        self.log.push(BackendCommand::DestroyFramebuffer { id });
        Ok(())
    }

    fn configure_multisample(&mut self, sample_count: Option<u32>) -> Result<(), RenderError> {
        if let Some(n) = sample_count.filter(|&n| n > self.max_samples) {
            return Err(RenderError::UnsupportedSampleCount(n));
        }
        self.log
            .push(BackendCommand::ConfigureMultisample { sample_count });
        Ok(())
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.log.push(BackendCommand::SetBlendMode(blend));
    }

    fn set_clear_color(&mut self, color: Color) {
        self.log.push(BackendCommand::SetClearColor(color));
    }

    fn acquire_frame(&mut self) -> Result<(), RenderError> {
        self.log.push(BackendCommand::AcquireFrame);
        Ok(())
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.bound = target;
        self.log.push(BackendCommand::BindTarget(target));
    }

    fn draw_batch(&mut self, draw: &BatchDraw) {
        self.log.push(BackendCommand::DrawBatch(*draw));
    }

    fn draw_fullscreen(&mut self, source: FramebufferId) {
        self.log.push(BackendCommand::DrawFullscreen {
            source,
            target: self.bound,
        });
    }

    fn resolve_multisample(&mut self, destination: RenderTarget) {
        self.log
            .push(BackendCommand::ResolveMultisample { destination });
    }

    fn present(&mut self) {
        self.log.push(BackendCommand::Present);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.log.push(BackendCommand::Resize { width, height });
    }
}
