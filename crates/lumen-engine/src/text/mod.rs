//! Fonts baked into glyph texture arrays.

mod font_atlas;
mod packer;

pub use font_atlas::{FaceId, FontAtlas, FontAtlasBuilder, FontFace, FontLoadError};
