use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4, Vec4Swizzles};

/// A half-space: points with a non-negative signed distance are inside.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Builds a normalized plane from `(a, b, c, d)` coefficients of
    /// `a*x + b*y + c*z + d >= 0`.
    pub fn from_coefficients(coefficients: Vec4) -> Plane {
        let length = coefficients.xyz().length();
        Plane {
            normal: coefficients.xyz() / length,
            distance: coefficients.w / length,
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn signed_distance_sides() {
        // y >= 1 half-space
        let plane = Plane::from_coefficients(Vec4::new(0.0, 2.0, 0.0, -2.0));
        assert!((plane.normal - Vec3::Y).length() < 1e-6);
        assert!(plane.signed_distance(vec3(0.0, 3.0, 0.0)) > 0.0);
        assert!(plane.signed_distance(vec3(5.0, 0.0, -2.0)) < 0.0);
        assert!(plane.signed_distance(vec3(0.0, 1.0, 0.0)).abs() < 1e-6);
    }
}
