//! Paint primitives (tint colors).

mod color;

pub use color::Color;
