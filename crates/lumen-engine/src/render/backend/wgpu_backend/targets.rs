use crate::render::backend::PostEffect;

use super::pipelines::Pipelines;

fn color_texture(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
    sample_count: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

/// Surface-sized offscreen target plus what is needed to sample it into
/// the next target.
pub(super) struct Framebuffer {
    label: String,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl Framebuffer {
    pub(super) fn new(
        device: &wgpu::Device,
        pipelines: &Pipelines,
        sampler: &wgpu::Sampler,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        label: &str,
        effect: &PostEffect,
    ) -> Self {
        let pipeline = pipelines.fullscreen(device, &format!("{label} effect"), effect);
        let (texture, view, bind_group) =
            Self::create_color(device, pipelines, sampler, format, size, label);
        Self {
            label: label.to_owned(),
            _texture: texture,
            view,
            bind_group,
            pipeline,
        }
    }

    fn create_color(
        device: &wgpu::Device,
        pipelines: &Pipelines,
        sampler: &wgpu::Sampler,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        label: &str,
    ) -> (wgpu::Texture, wgpu::TextureView, wgpu::BindGroup) {
        let texture = color_texture(
            device,
            label,
            format,
            size,
            1,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: pipelines.fullscreen_bgl(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        (texture, view, bind_group)
    }

    /// Recreates the color texture at `size`; the effect pipeline is kept.
    pub(super) fn resize(
        &mut self,
        device: &wgpu::Device,
        pipelines: &Pipelines,
        sampler: &wgpu::Sampler,
        format: wgpu::TextureFormat,
        size: (u32, u32),
    ) {
        let (texture, view, bind_group) =
            Self::create_color(device, pipelines, sampler, format, size, &self.label);
        self._texture = texture;
        self.view = view;
        self.bind_group = bind_group;
    }

    pub(super) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(super) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub(super) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

/// Multisampled color target, resolved into a single-sample target at the
/// end of the frame.
pub(super) struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sample_count: u32,
}

impl MultisampleTarget {
    pub(super) fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        sample_count: u32,
    ) -> Self {
        let texture = color_texture(
            device,
            "lumen msaa target",
            format,
            size,
            sample_count,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            sample_count,
        }
    }

    pub(super) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(super) fn sample_count(&self) -> u32 {
        self.sample_count
    }
}
