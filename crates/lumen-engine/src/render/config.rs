use super::vertex::INDICES_PER_QUAD;

/// Highest MSAA sample count accepted by the renderer.
pub const MAX_MSAA_SAMPLES: u32 = 16;

/// Multisample anti-aliasing settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MsaaConfig {
    pub enabled: bool,
    /// Power of two, at most [`MAX_MSAA_SAMPLES`].
    pub sample_count: u32,
}

impl Default for MsaaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_count: 4,
        }
    }
}

/// Color blending applied by the quad and text pipelines.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// `src * src.a + dst * (1 - src.a)`.
    #[default]
    Alpha,
    /// Source replaces destination.
    Opaque,
}

impl BlendMode {
    pub(crate) fn state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Opaque => None,
        }
    }
}

/// Renderer sizing and feature configuration.
///
/// Capacities are fixed for the renderer's lifetime; changing them requires
/// building a new renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Quads the quad batch holds before an overflow flush.
    pub max_quads: u32,
    /// Glyph quads the text batch holds before an overflow flush.
    pub max_glyphs: u32,
    pub msaa: MsaaConfig,
    pub blend: BlendMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_quads: 10_000,
            max_glyphs: 2_000,
            msaa: MsaaConfig::default(),
            blend: BlendMode::Alpha,
        }
    }
}

/// Largest quad capacity whose index count still fits in `u32`.
const MAX_QUADS_PER_BATCH: u32 = u32::MAX / INDICES_PER_QUAD;

impl RendererConfig {
    /// Panics on values that can only come from a setup mistake.
    pub fn validate(&self) {
        assert!(self.max_quads > 0, "RendererConfig: max_quads must be positive");
        assert!(self.max_glyphs > 0, "RendererConfig: max_glyphs must be positive");
        assert!(
            self.max_quads <= MAX_QUADS_PER_BATCH,
            "RendererConfig: max_quads '{}' overflows 32-bit indices",
            self.max_quads
        );
        assert!(
            self.max_glyphs <= MAX_QUADS_PER_BATCH,
            "RendererConfig: max_glyphs '{}' overflows 32-bit indices",
            self.max_glyphs
        );
        validate_sample_count(self.msaa.sample_count);
    }
}

/// Panics unless `sample_count` is a power of two no greater than 16.
pub fn validate_sample_count(sample_count: u32) {
    assert!(
        sample_count.is_power_of_two(),
        "MSAA sample count '{sample_count}' is not a power of 2"
    );
    assert!(
        sample_count <= MAX_MSAA_SAMPLES,
        "MSAA sample count too high: '{sample_count}', maximum is {MAX_MSAA_SAMPLES}"
    );
}
