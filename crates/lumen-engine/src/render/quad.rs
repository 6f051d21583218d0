use crate::coords::{Rotation, Vec2};
use crate::paint::Color;

use super::backend::{BatchKind, BufferId, GraphicsBackend, TextureArrayId};
use super::batch::Batch;
use super::vertex::BatchVertex;
use super::{SinkError, TextureCoordinates, VertexSink};

/// Accumulates textured, optionally rotated quads for one indexed draw.
pub struct QuadBatch {
    batch: Batch,
}

impl QuadBatch {
    pub(crate) fn new(backend: &mut dyn GraphicsBackend, max_quads: u32) -> Self {
        Self {
            batch: Batch::new(backend, BatchKind::Quad, "lumen quad batch", max_quads),
        }
    }

    /// Quads written since the last flush.
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
        position: Vec2,
        size: Vec2,
        angle: f32,
        coords: &TextureCoordinates,
        tint: Color,
    ) -> Result<(), SinkError> {
        self.batch.push(quad_corners(position, size, angle), coords, tint)
    }

    pub(crate) fn flush(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        camera: BufferId,
        textures: TextureArrayId,
    ) -> Option<u32> {
        self.batch.flush(backend, camera, textures)
    }
}

/// Corners of a `size` quad centred on `position`, rotated by `angle`
/// radians about its centre, in top-left, top-right, bottom-right,
/// bottom-left order.
///
/// An unrotated quad is computed directly from its half-extents, so its
/// corners are exactly `position ± size / 2`.
pub fn quad_corners(position: Vec2, size: Vec2, angle: f32) -> [Vec2; 4] {
    let half = size / 2.0;
    let rotation = Rotation::from_angle(angle);

    if rotation.is_identity() {
        let (x_min, x_max) = (position.x - half.x, position.x + half.x);
        let (y_min, y_max) = (position.y - half.y, position.y + half.y);
        return [
            Vec2::new(x_min, y_min),
            Vec2::new(x_max, y_min),
            Vec2::new(x_max, y_max),
            Vec2::new(x_min, y_max),
        ];
    }

    [
        Vec2::new(-half.x, -half.y),
        Vec2::new(half.x, -half.y),
        Vec2::new(half.x, half.y),
        Vec2::new(-half.x, half.y),
    ]
    .map(|corner| position + rotation.apply(corner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn assert_close(a: Vec2, b: Vec2) {
        assert!(
            (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn unrotated_corners_are_exact_half_extents() {
        let p = Vec2::new(10.3, -4.7);
        let s = Vec2::new(3.3, 0.9);
        let c = quad_corners(p, s, 0.0);
        assert_eq!(c[0], Vec2::new(p.x - s.x / 2.0, p.y - s.y / 2.0));
        assert_eq!(c[1], Vec2::new(p.x + s.x / 2.0, p.y - s.y / 2.0));
        assert_eq!(c[2], Vec2::new(p.x + s.x / 2.0, p.y + s.y / 2.0));
        assert_eq!(c[3], Vec2::new(p.x - s.x / 2.0, p.y + s.y / 2.0));
    }

    #[test]
    fn quarter_turn_rotates_corner_set() {
        let p = Vec2::new(5.0, 7.0);
        let s = Vec2::new(4.0, 2.0);
        let flat = quad_corners(p, s, 0.0);
        let turned = quad_corners(p, s, FRAC_PI_2);

        for (i, corner) in flat.iter().enumerate() {
            let d = *corner - p;
            // R(90°) · (x, y) = (-y, x)
            assert_close(turned[i], p + Vec2::new(-d.y, d.x));
        }
    }

    #[test]
    fn half_turn_swaps_opposite_corners() {
        let p = Vec2::new(0.0, 0.0);
        let s = Vec2::new(2.0, 6.0);
        let flat = quad_corners(p, s, 0.0);
        let turned = quad_corners(p, s, PI);
        assert_close(turned[0], flat[2]);
        assert_close(turned[1], flat[3]);
    }

    #[test]
    fn rotation_preserves_centre() {
        let p = Vec2::new(-3.0, 8.0);
        let c = quad_corners(p, Vec2::new(5.0, 1.0), 0.37);
        let centre = (c[0] + c[1] + c[2] + c[3]) / 4.0;
        assert_close(centre, p);
    }
}
