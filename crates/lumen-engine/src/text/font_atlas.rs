use std::collections::HashMap;

use thiserror::Error;

use crate::coords::Vec2;
use crate::render::{
    GlyphMetrics, GlyphSource, RenderError, Renderer, TextureArray, TextureArrayDesc,
    TextureArrayFormat, TextureArrayId, TextureCoordinates,
};

use super::packer::ShelfPacker;

/// Default edge length of one atlas layer in texels.
pub const DEFAULT_LAYER_SIZE: u32 = 1024;

/// Error returned by [`FontAtlasBuilder::add_font`].
#[derive(Debug, Clone, Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);

/// Index of a face inside a [`FontAtlas`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FaceId(pub(crate) usize);

struct PendingFace {
    px: f32,
    line_height: f32,
    glyphs: HashMap<char, GlyphMetrics>,
}

/// Rasterizes fonts with fontdue and packs their glyphs into the R8 layers
/// of one texture array.
pub struct FontAtlasBuilder {
    packer: ShelfPacker,
    layers: Vec<Vec<u8>>,
    faces: Vec<PendingFace>,
}

impl FontAtlasBuilder {
    pub fn new() -> Self {
        Self::with_layer_size(DEFAULT_LAYER_SIZE)
    }

    pub fn with_layer_size(layer_size: u32) -> Self {
        Self {
            packer: ShelfPacker::new(layer_size.max(1)),
            layers: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Bakes the printable ASCII range of a TrueType/OpenType font at `px`
    /// pixels per em.
    pub fn add_font(&mut self, bytes: &[u8], px: f32) -> Result<FaceId, FontLoadError> {
        self.add_font_chars(bytes, px, ' '..='~')
    }

    /// Bakes `chars` of a font at `px` pixels per em. Characters the font
    /// has no glyph for are left out of the face.
    pub fn add_font_chars(
        &mut self,
        bytes: &[u8],
        px: f32,
        chars: impl IntoIterator<Item = char>,
    ) -> Result<FaceId, FontLoadError> {
        if !(px.is_finite() && px > 0.0) {
            return Err(FontLoadError(format!("invalid pixel size {px}")));
        }
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;

        let line_height = font
            .horizontal_line_metrics(px)
            .map_or(px * 1.2, |m| m.new_line_size);

        let mut glyphs = HashMap::new();
        for ch in chars {
            if font.lookup_glyph_index(ch) == 0 && ch != ' ' {
                log::debug!("font has no glyph for {ch:?}");
                continue;
            }
            let (metrics, bitmap) = font.rasterize(ch, px);
            let (w, h) = (metrics.width as u32, metrics.height as u32);

            let coords = if w == 0 || h == 0 {
                TextureCoordinates::from_pixels(0, 0, 0, 0, 0, 1, 1)
            } else {
                match self.insert_bitmap(&bitmap, w, h) {
                    Some(coords) => coords,
                    None => {
                        log::warn!(
                            "glyph {ch:?} ({w}x{h}) does not fit a {0}x{0} atlas layer; skipped",
                            self.packer.layer_size()
                        );
                        continue;
                    }
                }
            };

            glyphs.insert(
                ch,
                GlyphMetrics {
                    advance: metrics.advance_width,
                    bearing: Vec2::new(metrics.xmin as f32, metrics.ymin as f32 + h as f32),
                    size: Vec2::new(w as f32, h as f32),
                    coords,
                },
            );
        }

        log::debug!("baked {} glyphs at {px}px", glyphs.len());
        let id = FaceId(self.faces.len());
        self.faces.push(PendingFace { px, line_height, glyphs });
        Ok(id)
    }

    /// Copies a tightly packed coverage bitmap into the next free cell.
    fn insert_bitmap(&mut self, bitmap: &[u8], w: u32, h: u32) -> Option<TextureCoordinates> {
        let placement = self.packer.place(w, h)?;
        let size = self.packer.layer_size() as usize;

        while self.layers.len() <= placement.layer as usize {
            self.layers.push(vec![0; size * size]);
        }
        let layer = &mut self.layers[placement.layer as usize];

        for (row, src) in bitmap.chunks_exact(w as usize).enumerate() {
            let start = (placement.y as usize + row) * size + placement.x as usize;
            layer[start..start + w as usize].copy_from_slice(src);
        }

        let size = size as u32;
        Some(TextureCoordinates::from_pixels(
            placement.layer,
            placement.x,
            placement.y,
            w,
            h,
            size,
            size,
        ))
    }

    /// Uploads the layers as one texture array and returns the faces bound
    /// to it.
    pub fn build(mut self, renderer: &mut Renderer<'_>) -> Result<FontAtlas, RenderError> {
        let size = self.packer.layer_size();
        if self.layers.is_empty() {
            self.layers.push(vec![0; (size * size) as usize]);
        }
        let layers: Vec<&[u8]> = self.layers.iter().map(Vec::as_slice).collect();

        let texture = renderer.create_texture_array(&TextureArrayDesc {
            label: "lumen glyph atlas",
            width: size,
            height: size,
            format: TextureArrayFormat::R8,
            layers: &layers,
        })?;

        log::info!(
            "glyph atlas: {} face(s), {} layer(s) of {size}x{size}",
            self.faces.len(),
            texture.layers
        );

        let faces = self
            .faces
            .into_iter()
            .map(|face| FontFace {
                px: face.px,
                line_height: face.line_height,
                glyphs: face.glyphs,
                textures: texture.id,
            })
            .collect();

        Ok(FontAtlas { texture, faces })
    }
}

impl Default for FontAtlasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Glyph texture array plus the faces baked into it.
pub struct FontAtlas {
    texture: TextureArray,
    faces: Vec<FontFace>,
}

impl FontAtlas {
    pub fn texture(&self) -> TextureArray {
        self.texture
    }

    pub fn face(&self, id: FaceId) -> Option<&FontFace> {
        self.faces.get(id.0)
    }
}

/// One font at one pixel size.
pub struct FontFace {
    px: f32,
    line_height: f32,
    glyphs: HashMap<char, GlyphMetrics>,
    textures: TextureArrayId,
}

impl FontFace {
    /// Pixel size the face was rasterized at.
    pub fn px(&self) -> f32 {
        self.px
    }

    /// Baseline-to-baseline distance at scale 1.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

impl GlyphSource for FontFace {
    fn glyph(&self, ch: char) -> Option<&GlyphMetrics> {
        self.glyphs.get(&ch)
    }

    fn texture_array(&self) -> TextureArrayId {
        self.textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::RecordingBackend;
    use crate::render::RendererConfig;

    #[test]
    fn bitmap_lands_at_its_placement() {
        let mut builder = FontAtlasBuilder::with_layer_size(8);
        let coords = builder.insert_bitmap(&[1, 2, 3, 4, 5, 6], 3, 2).unwrap();

        let layer = &builder.layers[0];
        assert_eq!(&layer[8 + 1..8 + 4], &[1, 2, 3]);
        assert_eq!(&layer[16 + 1..16 + 4], &[4, 5, 6]);
        assert_eq!(coords.x_min, 1.0 / 8.0);
        assert_eq!(coords.y_max, 3.0 / 8.0);
        assert_eq!(coords.slice, 0);
    }

    #[test]
    fn overflowing_layer_allocates_another() {
        let mut builder = FontAtlasBuilder::with_layer_size(8);
        builder.insert_bitmap(&[9; 36], 6, 6).unwrap();
        let coords = builder.insert_bitmap(&[7; 4], 2, 2).unwrap();
        assert_eq!(coords.slice, 1);
        assert_eq!(builder.layers.len(), 2);
    }

    #[test]
    fn rejects_garbage_font_bytes() {
        let mut builder = FontAtlasBuilder::new();
        assert!(builder.add_font(b"not a font", 16.0).is_err());

        let err = builder.add_font(b"", 0.0).unwrap_err();
        assert_eq!(err.to_string(), "font load error: invalid pixel size 0");
        assert!(builder.faces.is_empty());
    }

    #[test]
    fn empty_atlas_still_builds_one_layer() {
        let (backend, _log) = RecordingBackend::new(64, 64);
        let mut renderer = Renderer::new(backend, RendererConfig::default()).unwrap();
        let atlas = FontAtlasBuilder::with_layer_size(16).build(&mut renderer).unwrap();
        assert_eq!(atlas.texture().layers, 1);
        assert!(atlas.face(FaceId(0)).is_none());
    }
}
