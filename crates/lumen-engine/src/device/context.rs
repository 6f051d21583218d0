use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface::SurfaceState;
use super::{AcquireError, GpuFrame, GpuInit, GraphicsApi};

/// Device, queue and window surface for one window.
///
/// The surface borrows the window, so the window must outlive the `Gpu`.
pub struct Gpu<'w> {
    // wgpu requires the instance to outlive its surfaces.
    _instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    api: GraphicsApi,
    surface: SurfaceState<'w>,
}

impl<'w> Gpu<'w> {
    /// Creates the device on the API requested by `init` and configures a
    /// surface for `window`.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(
            size.width > 0 && size.height > 0,
            "cannot create a surface for a zero-sized window"
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.api.backends(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .with_context(|| format!("no adapter available for {:?}", init.api))?;

        let info = adapter.get_info();
        log::info!("graphics adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen device"),
                required_features: wgpu::Features::empty(),
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create device")?;

        let surface = SurfaceState::new(surface, &adapter, &device, size, &init)?;

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
            api: init.api,
            surface,
        })
    }

    pub fn api(&self) -> GraphicsApi {
        self.api
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface.format()
    }

    /// Drawable size in physical pixels. May be zero while minimized.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.surface.resize(&self.device, size);
    }

    /// Acquires the next backbuffer and opens a command encoder for it.
    pub fn acquire_frame(&self) -> Result<GpuFrame, AcquireError> {
        let surface_texture = self.surface.acquire(&self.device)?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen frame encoder"),
            });

        Ok(GpuFrame { surface_texture, view, encoder })
    }

    /// Submits the frame's commands and presents its backbuffer.
    pub fn present(&self, frame: GpuFrame) {
        let GpuFrame { surface_texture, view, encoder } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }
}
