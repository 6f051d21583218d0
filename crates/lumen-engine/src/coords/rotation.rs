use super::Vec2;

/// Precomputed 2x2 rotation.
///
/// Holds `cos`/`sin` of an angle so a batch of corners can be rotated without
/// re-evaluating the trig functions per vertex.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rotation {
    pub cos: f32,
    pub sin: f32,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation { cos: 1.0, sin: 0.0 };

    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        if angle == 0.0 {
            return Self::IDENTITY;
        }
        let (sin, cos) = angle.sin_cos();
        Self { cos, sin }
    }

    #[inline]
    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }

    /// Returns `R · v`.
    #[inline]
    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(
            v.x * self.cos - v.y * self.sin,
            v.x * self.sin + v.y * self.cos,
        )
    }

    /// Unit vector along the rotated +X axis.
    #[inline]
    pub fn axis(self) -> Vec2 {
        Vec2::new(self.cos, self.sin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5
    }

    #[test]
    fn zero_angle_is_exact_identity() {
        let r = Rotation::from_angle(0.0);
        assert!(r.is_identity());
        let v = Vec2::new(3.25, -7.5);
        assert_eq!(r.apply(v), v);
    }

    #[test]
    fn quarter_turn_maps_x_to_y() {
        let r = Rotation::from_angle(std::f32::consts::FRAC_PI_2);
        assert!(close(r.apply(Vec2::new(1.0, 0.0)), Vec2::new(0.0, 1.0)));
        assert!(close(r.apply(Vec2::new(0.0, 1.0)), Vec2::new(-1.0, 0.0)));
    }

    #[test]
    fn axis_matches_rotated_unit_x() {
        let r = Rotation::from_angle(0.7);
        assert!(close(r.axis(), r.apply(Vec2::new(1.0, 0.0))));
    }
}
