use std::collections::HashMap;

use crate::render::backend::{BatchKind, PostEffect};
use crate::render::vertex::{BatchVertex, CameraUniform, FullscreenVertex};
use crate::render::BlendMode;

const FULLSCREEN_PRELUDE: &str = include_str!("shaders/fullscreen.wgsl");

/// Minimum binding size of the camera uniform. `CameraUniform` is two 4x4
/// matrices, so this is never zero.
fn camera_binding_size() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(CameraUniform::SIZE)
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn primitive() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Shader modules, layouts and lazily built pipelines for one surface format.
pub(super) struct Pipelines {
    format: wgpu::TextureFormat,

    quad_shader: wgpu::ShaderModule,
    text_shader: wgpu::ShaderModule,

    batch_bgl: wgpu::BindGroupLayout,
    batch_layout: wgpu::PipelineLayout,
    fullscreen_bgl: wgpu::BindGroupLayout,
    fullscreen_layout: wgpu::PipelineLayout,

    batch: HashMap<(BatchKind, u32, BlendMode), wgpu::RenderPipeline>,
}

impl Pipelines {
    pub(super) fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let quad_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lumen quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });
        let text_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lumen text shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let batch_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen batch bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: camera_binding_size(),
                    },
                    count: None,
                },
                texture_entry(1, wgpu::TextureViewDimension::D2Array),
                sampler_entry(2),
            ],
        });
        let batch_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen batch pipeline layout"),
            bind_group_layouts: &[&batch_bgl],
            immediate_size: 0,
        });

        let fullscreen_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen fullscreen bgl"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                sampler_entry(1),
            ],
        });
        let fullscreen_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen fullscreen pipeline layout"),
            bind_group_layouts: &[&fullscreen_bgl],
            immediate_size: 0,
        });

        Self {
            format,
            quad_shader,
            text_shader,
            batch_bgl,
            batch_layout,
            fullscreen_bgl,
            fullscreen_layout,
            batch: HashMap::new(),
        }
    }

    pub(super) fn batch_bgl(&self) -> &wgpu::BindGroupLayout {
        &self.batch_bgl
    }

    pub(super) fn fullscreen_bgl(&self) -> &wgpu::BindGroupLayout {
        &self.fullscreen_bgl
    }

    /// Pipeline for `kind` rendering into a `sample_count` target.
    pub(super) fn batch(
        &mut self,
        device: &wgpu::Device,
        kind: BatchKind,
        sample_count: u32,
        blend: BlendMode,
    ) -> &wgpu::RenderPipeline {
        let Self { format, quad_shader, text_shader, batch_layout, batch, .. } = self;
        batch.entry((kind, sample_count, blend)).or_insert_with(|| {
            let (label, shader) = match kind {
                BatchKind::Quad => ("lumen quad pipeline", &*quad_shader),
                BatchKind::Text => ("lumen text pipeline", &*text_shader),
            };
            log::debug!("building {label} ({sample_count}x, {blend:?})");

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&*batch_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[BatchVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: *format,
                        blend: blend.state(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: primitive(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    ..Default::default()
                },
                multiview_mask: None,
                cache: None,
            })
        })
    }

    /// Full-screen pipeline applying `effect` to the sampled framebuffer.
    pub(super) fn fullscreen(
        &self,
        device: &wgpu::Device,
        label: &str,
        effect: &PostEffect,
    ) -> wgpu::RenderPipeline {
        let source = format!("{FULLSCREEN_PRELUDE}\n{}\n", effect.wgsl());
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.fullscreen_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[FullscreenVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}
