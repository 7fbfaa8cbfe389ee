use bytemuck::{Pod, Zeroable};
use glam::{vec4, Mat4, Vec3, Vec4Swizzles};

use crate::math::plane::Plane;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Frustum {
    // Planes are in the order: left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// World-space frustum corners, unprojected from the clip-volume corners
    /// (wgpu depth convention, near plane at z = 0).
    ///
    /// Order: near ring LB, RB, LT, RT, then the same for the far ring.
    pub fn corners(view_projection: Mat4) -> [Vec3; 8] {
        let corners: [glam::Vec4; 8] = [
            vec4(-1.0, -1.0, 0.0, 1.0),
            vec4(1.0, -1.0, 0.0, 1.0),
            vec4(-1.0, 1.0, 0.0, 1.0),
            vec4(1.0, 1.0, 0.0, 1.0),
            vec4(-1.0, -1.0, 1.0, 1.0),
            vec4(1.0, -1.0, 1.0, 1.0),
            vec4(-1.0, 1.0, 1.0, 1.0),
            vec4(1.0, 1.0, 1.0, 1.0),
        ];

        let inverse = view_projection.inverse();

        corners.map(|corner| {
            let mut corner = inverse * corner;
            corner = corner / corner.w;
            corner.xyz()
        })
    }

    /// Extracts the six half-spaces directly from the view-projection rows
    /// (clip volume `-w <= x,y <= w`, `0 <= z <= w`).
    pub fn from_view_projection(view_projection: Mat4) -> Frustum {
        let m = view_projection;

        let planes = [
            // Left
            Plane::from_coefficients(m.row(3) + m.row(0)),
            // Right
            Plane::from_coefficients(m.row(3) - m.row(0)),
            // Bottom
            Plane::from_coefficients(m.row(3) + m.row(1)),
            // Top
            Plane::from_coefficients(m.row(3) - m.row(1)),
            // Near
            Plane::from_coefficients(m.row(2)),
            // Far
            Plane::from_coefficients(m.row(3) - m.row(2)),
        ];

        Frustum { planes }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    fn test_view_projection() -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::ZERO, vec3(0.0, 0.0, -1.0), Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        proj * view
    }

    #[test]
    fn contains_points_along_view_axis() {
        let frustum = Frustum::from_view_projection(test_view_projection());

        assert!(frustum.contains_point(vec3(0.0, 0.0, -10.0)));
        assert!(frustum.contains_point(vec3(0.0, 0.0, -0.2)));
        // Behind the camera
        assert!(!frustum.contains_point(vec3(0.0, 0.0, 10.0)));
        // In front of the near plane
        assert!(!frustum.contains_point(vec3(0.0, 0.0, -0.05)));
        // Beyond the far plane
        assert!(!frustum.contains_point(vec3(0.0, 0.0, -200.0)));
        // Far off to the side
        assert!(!frustum.contains_point(vec3(50.0, 0.0, -10.0)));
    }

    #[test]
    fn plane_test_matches_clip_space_test() {
        let view_projection = test_view_projection();
        let frustum = Frustum::from_view_projection(view_projection);

        for x in -3..=3 {
            for y in -3..=3 {
                for z in -12..=2 {
                    let point = vec3(x as f32 * 4.0, y as f32 * 4.0, z as f32 * 10.0);
                    let clip = view_projection * point.extend(1.0);
                    let w = clip.w;
                    let inside_clip = clip.x >= -w
                        && clip.x <= w
                        && clip.y >= -w
                        && clip.y <= w
                        && clip.z >= 0.0
                        && clip.z <= w;
                    assert_eq!(
                        frustum.contains_point(point),
                        inside_clip,
                        "disagreement at {point:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn near_corners_sit_on_near_plane() {
        let view_projection = test_view_projection();
        let corners = Frustum::corners(view_projection);

        // Camera at the origin looking down -Z with a 0.1 near plane.
        for corner in &corners[0..4] {
            assert!((corner.z + 0.1).abs() < 1e-4, "near corner at {corner:?}");
        }
        for corner in &corners[4..8] {
            assert!((corner.z + 100.0).abs() < 0.1, "far corner at {corner:?}");
        }
    }
}
