use glam::{Mat3, Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

/// Perspective camera with an explicit look target, matching the demo's two
/// control schemes: the player camera moves along its look direction and
/// yaws in place, the god camera orbits its target at a fixed distance.
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
    distance: f32,
}

impl Camera {
    pub fn new(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_degrees: f32,
        near: f32,
        far: f32,
    ) -> Camera {
        Camera {
            eye,
            target,
            up,
            fov_y_degrees,
            near,
            far,
            aspect: 1.0,
            distance: (target - eye).length().max(1.0),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn proj_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj_matrix() * self.view_matrix()
    }

    /// Moves eye and target along the look direction. Positive `amount`
    /// advances toward the target.
    pub fn advance(&mut self, amount: f32) {
        let direction = (self.target - self.eye).normalize_or_zero();
        self.eye += direction * amount;
        self.target += direction * amount;
    }

    /// Rotates the look target around the eye about the world Y axis.
    pub fn yaw_around_eye(&mut self, angle: f32) {
        let offset = self.target - self.eye;
        self.target = self.eye + Mat3::from_rotation_y(angle) * offset;
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(2.0, 200.0);
    }

    pub fn add_distance(&mut self, delta: f32) {
        self.set_distance(self.distance + delta);
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct CameraUniform {
    view: Mat4,
    proj: Mat4,
    eye: Vec4,
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> CameraUniform {
        CameraUniform {
            view: camera.view_matrix(),
            proj: camera.proj_matrix(),
            eye: camera.eye.extend(1.0),
        }
    }
}

/// Uniform buffer + bind group for one camera. The renderer keeps one per
/// viewport so both views can be recorded into a single submission.
pub struct CameraBinding {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> CameraBinding {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        CameraBinding { buffer, bind_group }
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera) {
        let uniform = CameraUniform::from_camera(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn advance_moves_along_look_direction() {
        let mut camera = Camera::new(
            vec3(0.0, 10.0, 0.0),
            vec3(0.0, 10.0, -5.0),
            Vec3::Y,
            45.0,
            1.0,
            150.0,
        );
        camera.advance(2.0);
        assert!((camera.eye - vec3(0.0, 10.0, -2.0)).length() < 1e-5);
        assert!((camera.target - vec3(0.0, 10.0, -7.0)).length() < 1e-5);
    }

    #[test]
    fn yaw_keeps_eye_and_target_distance() {
        let mut camera = Camera::new(
            vec3(1.0, 2.0, 3.0),
            vec3(1.0, 2.0, -7.0),
            Vec3::Y,
            45.0,
            1.0,
            150.0,
        );
        let eye_before = camera.eye;
        let reach = (camera.target - camera.eye).length();

        camera.yaw_around_eye(0.7);

        assert_eq!(camera.eye, eye_before);
        assert!(((camera.target - camera.eye).length() - reach).abs() < 1e-4);
    }

    #[test]
    fn resize_changes_projection_aspect() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 60.0, 0.1, 100.0);
        camera.resize(100, 100);
        let square = camera.proj_matrix();
        camera.resize(200, 100);
        let wide = camera.proj_matrix();
        assert_ne!(square, wide);
        // Wider aspect shrinks the x scale
        assert!(wide.col(0).x < square.col(0).x);
    }

    #[test]
    fn distance_is_clamped() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 60.0, 0.1, 100.0);
        camera.set_distance(1000.0);
        assert_eq!(camera.distance(), 200.0);
        camera.add_distance(-1000.0);
        assert_eq!(camera.distance(), 2.0);
    }
}
