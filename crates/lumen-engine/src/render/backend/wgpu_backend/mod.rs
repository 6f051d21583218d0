//! [`GraphicsBackend`] on wgpu.
//!
//! Each batch draw records its own render pass on the bound target. The
//! first pass after `bind_target` clears; later passes load. A target bound
//! without any draw is still cleared before the next bind or present.
//!
//! Buffer uploads made during a frame are copied from a staging buffer on
//! the frame encoder, so every draw reads the data written just before it.

mod pipelines;
mod staging;
mod targets;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::device::{AcquireError, Gpu, GpuFrame};
use crate::paint::Color;
use crate::render::vertex::FULLSCREEN_VERTICES;
use crate::render::{BlendMode, RenderError, TextureArrayDesc};

use self::pipelines::Pipelines;
use self::staging::StagingCursor;
use self::targets::{Framebuffer, MultisampleTarget};
use super::{
    BatchDraw, BufferId, FramebufferId, GraphicsBackend, PostEffect, RenderTarget, Slots,
    TextureArrayId,
};

struct TextureArrayEntry {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Renders through a [`Gpu`] context bound to a window surface.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    pipelines: Pipelines,
    sampler: wgpu::Sampler,
    fullscreen_vbo: wgpu::Buffer,

    buffers: Slots<wgpu::Buffer>,
    textures: Slots<TextureArrayEntry>,
    framebuffers: Slots<Framebuffer>,
    multisample: Option<MultisampleTarget>,
    batch_bind_groups: HashMap<(BufferId, TextureArrayId), wgpu::BindGroup>,

    // uploads recorded into the frame encoder
    staging: wgpu::Buffer,
    staging_cursor: StagingCursor,

    blend: BlendMode,
    clear_color: wgpu::Color,

    // per frame
    frame: Option<GpuFrame>,
    bound: RenderTarget,
    clear_pending: bool,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        let device = gpu.device();
        let pipelines = Pipelines::new(device, gpu.surface_format());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let fullscreen_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen fullscreen vbo"),
            contents: bytemuck::cast_slice(&FULLSCREEN_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let staging_cursor = StagingCursor::new();
        let staging = create_staging(device, staging_cursor.capacity());

        log::debug!(
            "wgpu backend on {:?}, surface format {:?}",
            gpu.api(),
            gpu.surface_format()
        );

        Self {
            gpu,
            pipelines,
            sampler,
            fullscreen_vbo,
            buffers: Slots::new(),
            textures: Slots::new(),
            framebuffers: Slots::new(),
            multisample: None,
            batch_bind_groups: HashMap::new(),
            staging,
            staging_cursor,
            blend: BlendMode::default(),
            clear_color: wgpu::Color::BLACK,
            frame: None,
            bound: RenderTarget::Backbuffer,
            clear_pending: false,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    fn insert_buffer(&mut self, buffer: wgpu::Buffer) -> BufferId {
        BufferId(self.buffers.insert(buffer))
    }

    /// Clears the bound target if nothing has been drawn to it yet.
    fn flush_pending_clear(&mut self) {
        if !self.clear_pending {
            return;
        }
        let Some(frame) = self.frame.as_mut() else { return; };
        let GpuFrame { view: surface_view, encoder, .. } = frame;
        let Some((view, _)) =
            target_view(self.bound, surface_view, &self.multisample, &self.framebuffers)
        else {
            return;
        };
        self.clear_pending = false;
        let _pass = begin_pass(
            encoder,
            "lumen clear pass",
            view,
            None,
            wgpu::LoadOp::Clear(self.clear_color),
        );
    }
}

/// View and sample count of `target`, if it exists.
fn target_view<'a>(
    target: RenderTarget,
    surface_view: &'a wgpu::TextureView,
    multisample: &'a Option<MultisampleTarget>,
    framebuffers: &'a Slots<Framebuffer>,
) -> Option<(&'a wgpu::TextureView, u32)> {
    match target {
        RenderTarget::Backbuffer => Some((surface_view, 1)),
        RenderTarget::Multisample => multisample.as_ref().map(|m| (m.view(), m.sample_count())),
        RenderTarget::Framebuffer(id) => framebuffers.get(id.0).map(|f| (f.view(), 1)),
    }
}

fn load_op(clear_pending: &mut bool, color: wgpu::Color) -> wgpu::LoadOp<wgpu::Color> {
    if std::mem::take(clear_pending) {
        wgpu::LoadOp::Clear(color)
    } else {
        wgpu::LoadOp::Load
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    resolve_target: Option<&wgpu::TextureView>,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn create_staging(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lumen staging"),
        size,
        usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl GraphicsBackend for WgpuBackend<'_> {
    fn surface_size(&self) -> (u32, u32) {
        let size = self.gpu.size();
        (size.width, size.height)
    }

    fn create_vertex_buffer(&mut self, label: &str, size_bytes: u64) -> BufferId {
        let buffer = self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.insert_buffer(buffer)
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> BufferId {
        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.insert_buffer(buffer)
    }

    fn create_uniform_buffer(&mut self, label: &str, size_bytes: u64) -> BufferId {
        let buffer = self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size_bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.insert_buffer(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferId, bytes: &[u8]) {
        let Some(target) = self.buffers.get(buffer.0) else {
            log::error!("write_buffer: unknown buffer {buffer:?}");
            return;
        };
        if bytes.is_empty() {
            return;
        }
        debug_assert!(bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0);

        // Outside a frame nothing is recorded yet; a direct write is ordered.
        let Some(frame) = self.frame.as_mut() else {
            self.gpu.queue().write_buffer(target, 0, bytes);
            return;
        };

        let len = bytes.len() as u64;
        let offset = match self.staging_cursor.reserve(len) {
            Some(offset) => offset,
            None => {
                let capacity = self.staging_cursor.regrow(len);
                log::debug!("staging buffer grown to {capacity} bytes");
                self.staging = create_staging(self.gpu.device(), capacity);
                self.staging_cursor.reserve(len).unwrap_or_default()
            }
        };

        self.gpu.queue().write_buffer(&self.staging, offset, bytes);
        frame
            .encoder
            .copy_buffer_to_buffer(&self.staging, offset, target, 0, len);
    }

    fn create_texture_array(
        &mut self,
        desc: &TextureArrayDesc<'_>,
    ) -> Result<TextureArrayId, RenderError> {
        desc.validate().map_err(RenderError::InvalidTextureArray)?;

        let limits = self.gpu.device().limits();
        let layers = desc.layers.len() as u32;
        if layers > limits.max_texture_array_layers {
            return Err(RenderError::InvalidTextureArray(format!(
                "'{}' has {layers} layers, device maximum is {}",
                desc.label, limits.max_texture_array_layers
            )));
        }
        if desc.width.max(desc.height) > limits.max_texture_dimension_2d {
            return Err(RenderError::InvalidTextureArray(format!(
                "'{}' is {}x{}, device maximum is {}",
                desc.label, desc.width, desc.height, limits.max_texture_dimension_2d
            )));
        }

        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format.wgpu_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes_per_row = desc.width * desc.format.bytes_per_texel();
        for (z, texels) in desc.layers.iter().enumerate() {
            self.gpu.queue().write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: 0, y: 0, z: z as u32 },
                    aspect: wgpu::TextureAspect::All,
                },
                texels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(desc.height),
                },
                wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(desc.label),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let id = self.textures.insert(TextureArrayEntry { _texture: texture, view });
        Ok(TextureArrayId(id))
    }

    fn create_framebuffer(&mut self, label: &str, effect: &PostEffect) -> FramebufferId {
        let framebuffer = Framebuffer::new(
            self.gpu.device(),
            &self.pipelines,
            &self.sampler,
            self.gpu.surface_format(),
            self.surface_size(),
            label,
            effect,
        );
        FramebufferId(self.framebuffers.insert(framebuffer))
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) -> Result<(), RenderError> {
        self.framebuffers
            .remove(id.0)
            .ok_or(RenderError::UnknownFramebuffer(id))?;
        if self.bound == RenderTarget::Framebuffer(id) {
            self.bound = RenderTarget::Backbuffer;
            self.clear_pending = false;
        }
        Ok(())
    }

    fn configure_multisample(&mut self, sample_count: Option<u32>) -> Result<(), RenderError> {
        let Some(n) = sample_count else {
            self.multisample = None;
            return Ok(());
        };

        // A single-sample target has nothing to resolve.
        let format = self.gpu.surface_format();
        let flags = self.gpu.adapter().get_texture_format_features(format).flags;
        if n < 2 || !flags.sample_count_supported(n) {
            log::error!("{n}x multisampling is not supported for {format:?}");
            return Err(RenderError::UnsupportedSampleCount(n));
        }

        self.multisample = Some(MultisampleTarget::new(
            self.gpu.device(),
            format,
            self.surface_size(),
            n,
        ));
        Ok(())
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color.into();
    }

    fn acquire_frame(&mut self) -> Result<(), RenderError> {
        if self.frame.take().is_some() {
            log::warn!("acquire_frame: previous frame was never presented; dropped");
        }

        match self.gpu.acquire_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                self.staging_cursor.reset();
                self.bound = RenderTarget::Backbuffer;
                self.clear_pending = false;
                Ok(())
            }
            Err(AcquireError::Skipped(err)) => {
                log::debug!("frame skipped: {err:?}");
                Err(RenderError::FrameSkipped)
            }
            Err(AcquireError::Fatal(err)) => {
                log::error!("surface unrecoverable: {err:?}");
                Err(RenderError::SurfaceLost)
            }
        }
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.flush_pending_clear();
        self.bound = target;
        self.clear_pending = true;
    }

    fn draw_batch(&mut self, draw: &BatchDraw) {
        let Some(frame) = self.frame.as_mut() else {
            log::error!("draw_batch without an acquired frame; dropped");
            return;
        };
        let GpuFrame { view: surface_view, encoder, .. } = frame;

        let Some((view, sample_count)) =
            target_view(self.bound, surface_view, &self.multisample, &self.framebuffers)
        else {
            log::error!("draw_batch: render target {:?} does not exist", self.bound);
            return;
        };
        let (Some(vbo), Some(ibo)) = (
            self.buffers.get(draw.vertex_buffer.0),
            self.buffers.get(draw.index_buffer.0),
        ) else {
            log::error!("draw_batch: unknown vertex or index buffer");
            return;
        };

        let device = self.gpu.device();
        let bind_group = match self.batch_bind_groups.entry((draw.camera, draw.textures)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (Some(camera), Some(textures)) = (
                    self.buffers.get(draw.camera.0),
                    self.textures.get(draw.textures.0),
                ) else {
                    log::error!("draw_batch: unknown camera buffer or texture array");
                    return;
                };
                entry.insert(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("lumen batch bind group"),
                    layout: self.pipelines.batch_bgl(),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: camera.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&textures.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                }))
            }
        };

        let pipeline = self.pipelines.batch(device, draw.kind, sample_count, self.blend);
        let load = load_op(&mut self.clear_pending, self.clear_color);

        let mut pass = begin_pass(encoder, "lumen batch pass", view, None, load);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &*bind_group, &[]);
        pass.set_vertex_buffer(0, vbo.slice(..));
        pass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..draw.index_count, 0, 0..1);
    }

    fn draw_fullscreen(&mut self, source: FramebufferId) {
        if self.bound == RenderTarget::Framebuffer(source) {
            log::error!("draw_fullscreen: {source:?} cannot sample itself");
            return;
        }
        let Some(frame) = self.frame.as_mut() else {
            log::error!("draw_fullscreen without an acquired frame; dropped");
            return;
        };
        let GpuFrame { view: surface_view, encoder, .. } = frame;

        let Some((view, 1)) =
            target_view(self.bound, surface_view, &self.multisample, &self.framebuffers)
        else {
            log::error!("draw_fullscreen: {:?} is not a single-sample target", self.bound);
            return;
        };
        let Some(framebuffer) = self.framebuffers.get(source.0) else {
            log::error!("draw_fullscreen: unknown framebuffer {source:?}");
            return;
        };

        let load = load_op(&mut self.clear_pending, self.clear_color);
        let mut pass = begin_pass(encoder, "lumen fullscreen pass", view, None, load);
        pass.set_pipeline(framebuffer.pipeline());
        pass.set_bind_group(0, framebuffer.bind_group(), &[]);
        pass.set_vertex_buffer(0, self.fullscreen_vbo.slice(..));
        pass.draw(0..FULLSCREEN_VERTICES.len() as u32, 0..1);
    }

    fn resolve_multisample(&mut self, destination: RenderTarget) {
        let Some(frame) = self.frame.as_mut() else {
            log::error!("resolve_multisample without an acquired frame");
            return;
        };
        let GpuFrame { view: surface_view, encoder, .. } = frame;

        let Some(multisample) = self.multisample.as_ref() else {
            log::error!("resolve_multisample: no multisample target configured");
            return;
        };
        let Some((resolve_view, 1)) =
            target_view(destination, surface_view, &self.multisample, &self.framebuffers)
        else {
            log::error!("resolve_multisample: {destination:?} is not a single-sample target");
            return;
        };

        // An empty pass on the multisample view resolves it on store.
        let load = load_op(&mut self.clear_pending, self.clear_color);
        let _pass = begin_pass(
            encoder,
            "lumen msaa resolve",
            multisample.view(),
            Some(resolve_view),
            load,
        );
    }

    fn present(&mut self) {
        self.flush_pending_clear();
        match self.frame.take() {
            Some(frame) => self.gpu.present(frame),
            None => log::warn!("present without an acquired frame"),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));

        let size = (width, height);
        let format = self.gpu.surface_format();
        for (_, framebuffer) in self.framebuffers.iter_mut() {
            framebuffer.resize(self.gpu.device(), &self.pipelines, &self.sampler, format, size);
        }
        if let Some(n) = self.multisample.as_ref().map(MultisampleTarget::sample_count) {
            self.multisample = Some(MultisampleTarget::new(self.gpu.device(), format, size, n));
        }
        log::debug!("resized render targets to {width}x{height}");
    }
}
