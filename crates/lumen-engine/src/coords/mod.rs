//! Coordinate and geometry types shared by the batches and the camera.
//!
//! World space used by draw calls:
//! - units are whatever the active camera maps to its view volume
//! - +X right, +Y down (the camera projection flips Y for NDC)
//! - angles are radians; positive angles turn +X towards +Y

mod rotation;
mod vec2;

pub use rotation::Rotation;
pub use vec2::Vec2;
