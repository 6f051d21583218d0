use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use super::{AcquireError, GpuInit};

/// The window surface together with its active configuration.
///
/// A zero-area size (minimized window) is remembered but never configured;
/// acquisition is skipped until a non-zero size arrives.
pub(crate) struct SurfaceState<'w> {
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

impl<'w> SurfaceState<'w> {
    pub(crate) fn new(
        surface: wgpu::Surface<'w>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        init: &GpuInit,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(adapter);
        let format = pick_format(&caps, init.prefer_srgb)
            .context("surface reports no supported formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: pick_present_mode(&caps, init.present_mode),
            alpha_mode: pick_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(device, &config);

        log::debug!(
            "surface configured: {:?} {}x{} {:?}",
            config.format,
            config.width,
            config.height,
            config.present_mode
        );

        Ok(Self { surface, config, size })
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn is_drawable(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.size = size;
        if !self.is_drawable() {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(device, &self.config);
    }

    /// Acquires the next backbuffer, reconfiguring after `Lost`/`Outdated`.
    pub(crate) fn acquire(
        &self,
        device: &wgpu::Device,
    ) -> Result<wgpu::SurfaceTexture, AcquireError> {
        if !self.is_drawable() {
            return Err(AcquireError::Skipped(wgpu::SurfaceError::Outdated));
        }

        match self.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::debug!("surface {err:?}; reconfiguring");
                self.surface.configure(device, &self.config);
                Err(AcquireError::Skipped(err))
            }
            Err(err @ wgpu::SurfaceError::OutOfMemory) => Err(AcquireError::Fatal(err)),
            Err(err) => Err(AcquireError::Skipped(err)),
        }
    }
}

fn pick_format(caps: &wgpu::SurfaceCapabilities, prefer_srgb: bool) -> Option<wgpu::TextureFormat> {
    let preferred = caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == prefer_srgb);
    preferred.or_else(|| caps.formats.first().copied())
}

fn pick_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    if caps.present_modes.contains(&requested) {
        requested
    } else {
        log::warn!("present mode {requested:?} unsupported; using Fifo");
        wgpu::PresentMode::Fifo
    }
}

fn pick_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|mode| caps.alpha_modes.contains(mode))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps_with(formats: &[wgpu::TextureFormat]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            present_modes: vec![wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn format_follows_srgb_preference() {
        let caps = caps_with(&[
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        assert_eq!(pick_format(&caps, true), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert_eq!(pick_format(&caps, false), Some(wgpu::TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn format_falls_back_to_first_reported() {
        let caps = caps_with(&[wgpu::TextureFormat::Rgba8Unorm]);
        assert_eq!(pick_format(&caps, true), Some(wgpu::TextureFormat::Rgba8Unorm));
        assert_eq!(pick_format(&caps_with(&[]), true), None);
    }

    #[test]
    fn unsupported_modes_fall_back() {
        let caps = caps_with(&[wgpu::TextureFormat::Rgba8Unorm]);
        assert_eq!(
            pick_present_mode(&caps, wgpu::PresentMode::Immediate),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            pick_present_mode(&caps, wgpu::PresentMode::Mailbox),
            wgpu::PresentMode::Mailbox
        );
        assert_eq!(
            pick_alpha_mode(&caps, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }
}
