use super::backend::TextureArrayId;

/// Region of one texture-array layer sampled by a quad.
///
/// UVs are normalized with the origin at the layer's top-left texel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureCoordinates {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    /// Layer of the bound texture array.
    pub slice: u32,
}

impl TextureCoordinates {
    /// The whole of layer 0. With the default texture array this samples
    /// plain white, i.e. an untextured quad colored by its tint.
    pub const FULL: TextureCoordinates = TextureCoordinates::layer(0);

    pub const fn layer(slice: u32) -> Self {
        Self {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
            slice,
        }
    }

    /// Coordinates of a pixel rectangle inside a `layer_width` × `layer_height` layer.
    pub fn from_pixels(
        slice: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        layer_width: u32,
        layer_height: u32,
    ) -> Self {
        let lw = layer_width.max(1) as f32;
        let lh = layer_height.max(1) as f32;
        Self {
            x_min: x as f32 / lw,
            x_max: (x + width) as f32 / lw,
            y_min: y as f32 / lh,
            y_max: (y + height) as f32 / lh,
            slice,
        }
    }

    /// UV (+ slice) for each corner in top-left, top-right, bottom-right,
    /// bottom-left order.
    #[inline]
    pub(crate) fn corners(&self) -> [[f32; 3]; 4] {
        let s = self.slice as f32;
        [
            [self.x_min, self.y_min, s],
            [self.x_max, self.y_min, s],
            [self.x_max, self.y_max, s],
            [self.x_min, self.y_max, s],
        ]
    }
}

impl Default for TextureCoordinates {
    fn default() -> Self {
        Self::FULL
    }
}

/// Texel format of a texture array.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureArrayFormat {
    /// 4 bytes per texel, sRGB color.
    Rgba8,
    /// 1 byte per texel, coverage (glyph atlases).
    R8,
}

impl TextureArrayFormat {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TextureArrayFormat::Rgba8 => 4,
            TextureArrayFormat::R8 => 1,
        }
    }

    pub(crate) fn wgpu_format(self) -> wgpu::TextureFormat {
        match self {
            TextureArrayFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureArrayFormat::R8 => wgpu::TextureFormat::R8Unorm,
        }
    }
}

/// Description of a texture array to upload: equally sized layers.
#[derive(Debug, Clone)]
pub struct TextureArrayDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: TextureArrayFormat,
    /// One tightly packed texel buffer per layer.
    pub layers: &'a [&'a [u8]],
}

impl TextureArrayDesc<'_> {
    /// Checks dimensions and per-layer byte counts.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("'{}' has zero size", self.label));
        }
        if self.layers.is_empty() {
            return Err(format!("'{}' has no layers", self.label));
        }
        let expected =
            self.width as usize * self.height as usize * self.format.bytes_per_texel() as usize;
        if let Some((i, layer)) = self
            .layers
            .iter()
            .enumerate()
            .find(|(_, l)| l.len() != expected)
        {
            return Err(format!(
                "'{}' layer {i} has {} bytes, expected {expected}",
                self.label,
                layer.len()
            ));
        }
        Ok(())
    }
}

/// A texture array created through the renderer, ready to be bound.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureArray {
    pub id: TextureArrayId,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_follow_fixed_winding() {
        let c = TextureCoordinates { x_min: 0.1, x_max: 0.9, y_min: 0.2, y_max: 0.8, slice: 3 };
        assert_eq!(
            c.corners(),
            [[0.1, 0.2, 3.0], [0.9, 0.2, 3.0], [0.9, 0.8, 3.0], [0.1, 0.8, 3.0]]
        );
    }

    #[test]
    fn pixel_rect_normalizes() {
        let c = TextureCoordinates::from_pixels(1, 16, 32, 16, 32, 64, 128);
        assert_eq!((c.x_min, c.x_max), (0.25, 0.5));
        assert_eq!((c.y_min, c.y_max), (0.25, 0.5));
        assert_eq!(c.slice, 1);
    }

    #[test]
    fn desc_rejects_short_layer() {
        let full = [0u8; 16];
        let short = [0u8; 12];
        let layers: [&[u8]; 2] = [&full, &short];
        let desc = TextureArrayDesc {
            label: "t",
            width: 2,
            height: 2,
            format: TextureArrayFormat::Rgba8,
            layers: &layers,
        };
        let err = desc.validate().unwrap_err();
        assert!(err.contains("layer 1"), "{err}");
    }
}
