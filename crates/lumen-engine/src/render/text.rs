use crate::coords::{Rotation, Vec2};
use crate::paint::Color;

use super::backend::{BatchKind, BufferId, GraphicsBackend, TextureArrayId};
use super::batch::Batch;
use super::vertex::BatchVertex;
use super::{SinkError, TextureCoordinates, VertexSink};

/// Layout and atlas data for one character.
///
/// Units are glyph pixels; `DrawString` multiplies them by its scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphMetrics {
    /// Pen advance after this glyph.
    pub advance: f32,
    /// Offset from the pen (on the baseline) to the glyph box's top-left
    /// corner: `x` to the right, `y` upwards.
    pub bearing: Vec2,
    /// Glyph box size.
    pub size: Vec2,
    pub coords: TextureCoordinates,
}

/// Per-character metrics provider (a font baked into a texture array).
pub trait GlyphSource {
    /// Metrics for `ch`, or `None` if the font cannot draw it.
    fn glyph(&self, ch: char) -> Option<&GlyphMetrics>;

    /// Texture array holding this font's glyph coverage.
    fn texture_array(&self) -> TextureArrayId;
}

/// Accumulates glyph quads for one indexed draw.
pub struct TextBatch {
    batch: Batch,
    textures: Option<TextureArrayId>,
}

impl TextBatch {
    pub(crate) fn new(backend: &mut dyn GraphicsBackend, max_glyphs: u32) -> Self {
        Self {
            batch: Batch::new(backend, BatchKind::Text, "lumen text batch", max_glyphs),
            textures: None,
        }
    }

    /// Glyph quads written since the last flush.
    pub fn quad_count(&self) -> u32 {
        self.batch.quad_count()
    }

    pub fn capacity(&self) -> u32 {
        self.batch.max_quads()
    }

    pub fn sink(&self) -> &VertexSink<BatchVertex> {
        self.batch.sink()
    }

    pub fn vertex_buffer(&self) -> BufferId {
        self.batch.vertex_buffer()
    }

    /// Glyph texture array the pending quads sample from.
    pub fn textures(&self) -> Option<TextureArrayId> {
        self.textures
    }

    pub(crate) fn set_textures(&mut self, textures: TextureArrayId) {
        self.textures = Some(textures);
    }

    pub(crate) fn is_mapped(&self) -> bool {
        self.batch.is_mapped()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.batch.is_full()
    }

    pub(crate) fn begin(&mut self) {
        self.batch.begin();
    }

    pub(crate) fn push(
        &mut self,
        corners: [Vec2; 4],
        coords: &TextureCoordinates,
        tint: Color,
    ) -> Result<(), SinkError> {
        self.batch.push(corners, coords, tint)
    }

    pub(crate) fn flush(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        camera: BufferId,
        fallback: TextureArrayId,
    ) -> Option<u32> {
        let textures = self.textures.unwrap_or(fallback);
        self.batch.flush(backend, camera, textures)
    }
}

/// Sum of the scaled advances of `text`, in unrotated pen units.
///
/// Characters the font lacks contribute nothing.
pub fn measure_advance(text: &str, font: &dyn GlyphSource, scale: f32) -> f32 {
    text.chars()
        .filter_map(|ch| font.glyph(ch))
        .map(|g| g.advance * scale)
        .sum()
}

/// Pen start that centres `text` on `position` along the rotated baseline.
pub(crate) fn pen_start(
    text: &str,
    font: &dyn GlyphSource,
    position: Vec2,
    rotation: Rotation,
    scale: f32,
) -> Vec2 {
    let total = rotation.axis() * measure_advance(text, font, scale);
    position - total / 2.0
}

/// Corners of one glyph quad whose pen sits at `pen`.
///
/// The box hangs from `pen + R · (bearing.x, -bearing.y)`; its edges are the
/// rotated glyph width and height.
pub(crate) fn glyph_corners(
    pen: Vec2,
    glyph: &GlyphMetrics,
    rotation: Rotation,
    scale: f32,
) -> [Vec2; 4] {
    let top_left = pen + rotation.apply(Vec2::new(glyph.bearing.x, -glyph.bearing.y) * scale);
    let across = rotation.apply(Vec2::new(glyph.size.x * scale, 0.0));
    let down = rotation.apply(Vec2::new(0.0, glyph.size.y * scale));
    [
        top_left,
        top_left + across,
        top_left + across + down,
        top_left + down,
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Fixed-metric font for layout tests.
    pub(crate) struct FixedFont {
        pub glyphs: HashMap<char, GlyphMetrics>,
        pub textures: TextureArrayId,
    }

    impl FixedFont {
        pub(crate) fn new(textures: TextureArrayId) -> Self {
            Self { glyphs: HashMap::new(), textures }
        }

        pub(crate) fn with(mut self, ch: char, advance: f32, bearing: Vec2, size: Vec2) -> Self {
            self.glyphs.insert(
                ch,
                GlyphMetrics { advance, bearing, size, coords: TextureCoordinates::FULL },
            );
            self
        }
    }

    impl GlyphSource for FixedFont {
        fn glyph(&self, ch: char) -> Option<&GlyphMetrics> {
            self.glyphs.get(&ch)
        }

        fn texture_array(&self) -> TextureArrayId {
            self.textures
        }
    }

    fn font() -> FixedFont {
        FixedFont::new(TextureArrayId(0))
            .with('A', 10.0, Vec2::new(1.0, 8.0), Vec2::new(8.0, 8.0))
            .with('B', 6.0, Vec2::new(2.0, 7.0), Vec2::new(4.0, 9.0))
    }

    #[test]
    fn string_is_centred_on_position() {
        let f = font();
        let pen = pen_start("AB", &f, Vec2::zero(), Rotation::IDENTITY, 1.0);
        assert_eq!(pen, Vec2::new(-8.0, 0.0));

        let a = f.glyph('A').unwrap();
        let corners = glyph_corners(pen, a, Rotation::IDENTITY, 1.0);
        assert_eq!(corners[0].x, -(10.0 + 6.0) / 2.0 + 1.0);
        // top edge sits bearing.y above the baseline
        assert_eq!(corners[0].y, -8.0);
        assert_eq!(corners[2], Vec2::new(-7.0 + 8.0, 0.0));
    }

    #[test]
    fn scale_multiplies_layout() {
        let f = font();
        assert_eq!(measure_advance("AB", &f, 2.0), 32.0);
        let pen = pen_start("AB", &f, Vec2::new(100.0, 0.0), Rotation::IDENTITY, 2.0);
        assert_eq!(pen.x, 84.0);
    }

    #[test]
    fn empty_string_starts_at_position() {
        let f = font();
        let p = Vec2::new(3.0, 4.0);
        assert_eq!(pen_start("", &f, p, Rotation::IDENTITY, 1.0), p);
    }

    #[test]
    fn missing_glyphs_do_not_advance() {
        let f = font();
        assert_eq!(measure_advance("A?B", &f, 1.0), 16.0);
    }

    #[test]
    fn rotated_string_centres_along_axis() {
        let f = font();
        let rotation = Rotation::from_angle(std::f32::consts::FRAC_PI_2);
        let pen = pen_start("AB", &f, Vec2::zero(), rotation, 1.0);
        assert!(pen.x.abs() < 1e-5);
        assert!((pen.y + 8.0).abs() < 1e-5);

        // A quarter turn carries the box's "across" edge onto +Y.
        let corners = glyph_corners(Vec2::zero(), f.glyph('A').unwrap(), rotation, 1.0);
        let across = corners[1] - corners[0];
        assert!(across.x.abs() < 1e-5 && (across.y - 8.0).abs() < 1e-5);
    }
}
