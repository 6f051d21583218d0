/// Native graphics API the device is created on.
///
/// `Default` selects the platform's preferred backend set (DirectX 12 on
/// Windows, Metal on Apple platforms, Vulkan/GL elsewhere).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum GraphicsApi {
    #[default]
    Default,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

impl GraphicsApi {
    pub fn backends(self) -> wgpu::Backends {
        match self {
            GraphicsApi::Default => wgpu::Backends::PRIMARY,
            GraphicsApi::Vulkan => wgpu::Backends::VULKAN,
            GraphicsApi::Metal => wgpu::Backends::METAL,
            GraphicsApi::Dx12 => wgpu::Backends::DX12,
            GraphicsApi::Gl => wgpu::Backends::GL,
        }
    }
}

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Graphics API to create the device on.
    pub api: GraphicsApi,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is v-sync and always supported.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            api: GraphicsApi::Default,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_api_selects_single_backend() {
        assert_eq!(GraphicsApi::Vulkan.backends(), wgpu::Backends::VULKAN);
        assert_eq!(GraphicsApi::Gl.backends(), wgpu::Backends::GL);
    }

    #[test]
    fn default_api_uses_primary_backends() {
        assert_eq!(GpuInit::default().api.backends(), wgpu::Backends::PRIMARY);
    }
}
