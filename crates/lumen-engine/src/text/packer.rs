/// Pixels left empty around every glyph.
pub(crate) const GLYPH_PADDING: u32 = 1;

/// Where a glyph landed in the atlas.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Placement {
    pub layer: u32,
    pub x: u32,
    pub y: u32,
}

/// Shelf packer over a stack of square layers.
///
/// Glyphs fill a row left to right; a glyph that does not fit horizontally
/// opens a new row below the tallest glyph of the current one, and one that
/// does not fit vertically opens a new layer.
#[derive(Debug)]
pub(crate) struct ShelfPacker {
    size: u32,
    layer: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    pub(crate) fn new(size: u32) -> Self {
        Self {
            size,
            layer: 0,
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
        }
    }

    pub(crate) fn layer_size(&self) -> u32 {
        self.size
    }

    /// Layers touched so far (at least one).
    #[cfg(test)]
    pub(crate) fn layer_count(&self) -> u32 {
        self.layer + 1
    }

    /// Reserves a `w` × `h` cell. `None` if the glyph can never fit a layer.
    pub(crate) fn place(&mut self, w: u32, h: u32) -> Option<Placement> {
        if w + 2 * GLYPH_PADDING > self.size || h + 2 * GLYPH_PADDING > self.size {
            return None;
        }

        if self.cursor_x + w + GLYPH_PADDING > self.size {
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.cursor_x = GLYPH_PADDING;
            self.row_height = 0;
        }

        if self.cursor_y + h + GLYPH_PADDING > self.size {
            self.layer += 1;
            self.cursor_x = GLYPH_PADDING;
            self.cursor_y = GLYPH_PADDING;
            self.row_height = 0;
        }

        let placement = Placement {
            layer: self.layer,
            x: self.cursor_x,
            y: self.cursor_y,
        };
        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);
        Some(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_rows_left_to_right() {
        let mut p = ShelfPacker::new(32);
        assert_eq!(p.place(10, 4), Some(Placement { layer: 0, x: 1, y: 1 }));
        assert_eq!(p.place(10, 6), Some(Placement { layer: 0, x: 12, y: 1 }));
    }

    #[test]
    fn wraps_below_tallest_glyph_of_row() {
        let mut p = ShelfPacker::new(32);
        p.place(10, 4);
        p.place(10, 6);
        // 23 + 10 + 1 > 32: new row at 1 + 6 + 1
        assert_eq!(p.place(10, 3), Some(Placement { layer: 0, x: 1, y: 8 }));
    }

    #[test]
    fn full_layer_opens_next_one() {
        let mut p = ShelfPacker::new(16);
        assert_eq!(p.place(14, 14).map(|g| g.layer), Some(0));
        assert_eq!(p.place(4, 4), Some(Placement { layer: 1, x: 1, y: 1 }));
        assert_eq!(p.layer_count(), 2);
    }

    #[test]
    fn rejects_glyph_larger_than_a_layer() {
        let mut p = ShelfPacker::new(16);
        assert_eq!(p.place(15, 2), None);
        assert_eq!(p.layer_count(), 1);
    }
}
