use glam::{Mat4, Vec3};

use crate::coords::Vec2;
use crate::paint::Color;

use super::vertex::CameraUniform;

/// Orthographic 2D camera.
///
/// `zoom` is the half-height of the visible region in world units; the
/// half-width follows from `aspect_ratio`. World +Y points down the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    pub aspect_ratio: f32,
    pub zoom: f32,
    /// Color render targets are cleared to when bound.
    pub clear_color: Color,
}

impl Camera {
    pub fn new(position: Vec2, aspect_ratio: f32, zoom: f32) -> Self {
        Self {
            position,
            aspect_ratio,
            zoom,
            clear_color: Color::BLACK,
        }
    }

    /// Camera whose visible region is exactly `width` × `height` world
    /// units centred on the origin.
    pub fn for_viewport(width: f32, height: f32) -> Self {
        let height = height.max(1.0);
        Self::new(Vec2::zero(), width.max(1.0) / height, height / 2.0)
    }

    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(-self.position.x, -self.position.y, 0.0))
    }

    pub fn projection(&self) -> Mat4 {
        let half_h = self.zoom;
        let half_w = self.zoom * self.aspect_ratio;
        // bottom = +half_h, top = -half_h: world +Y maps to screen-down.
        Mat4::orthographic_rh(-half_w, half_w, half_h, -half_h, -1.0, 1.0)
    }

    pub(crate) fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view: self.view().to_cols_array_2d(),
            projection: self.projection().to_cols_array_2d(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::zero(), 16.0 / 9.0, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn to_ndc(camera: &Camera, x: f32, y: f32) -> Vec4 {
        camera.projection() * camera.view() * Vec4::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn centre_maps_to_ndc_origin() {
        let camera = Camera::new(Vec2::new(50.0, -20.0), 2.0, 100.0);
        let p = to_ndc(&camera, 50.0, -20.0);
        assert!(p.x.abs() < 1e-6 && p.y.abs() < 1e-6);
    }

    #[test]
    fn positive_y_is_screen_down() {
        let camera = Camera::new(Vec2::zero(), 1.0, 10.0);
        let p = to_ndc(&camera, 0.0, 10.0);
        assert!((p.y + 1.0).abs() < 1e-6, "y = {}", p.y);
    }

    #[test]
    fn aspect_widens_horizontal_extent() {
        let camera = Camera::new(Vec2::zero(), 2.0, 10.0);
        let p = to_ndc(&camera, 20.0, 0.0);
        assert!((p.x - 1.0).abs() < 1e-6);
    }
}
