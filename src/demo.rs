use glam::{Vec2, Vec3};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::trajectory::SlimeTrajectory;

const PLAYER_MOVE_SPEED: f32 = 15.0;
const PLAYER_TURN_SPEED: f32 = 0.6;
const TRACKBALL_SENSITIVITY: f32 = 0.005;
const PITCH_LIMIT: f32 = 1.3;
const ZOOM_STEP: f32 = 4.0;
const DEFAULT_ERASE_RADIUS: f32 = 6.0;
const ERASE_RADIUS_RATE: f32 = 5.0;
const MAX_ERASE_RADIUS: f32 = 30.0;

/// Everything the renderer needs to draw one frame: both cameras, the slime
/// agent and the erase settings. The player camera is the one that feeds the
/// cull kernel; the god camera only observes.
pub struct DemoState {
    pub god_camera: Camera,
    pub player_camera: Camera,
    pub slime: SlimeTrajectory,
    pub erasing: bool,
    erase_radius: f32,

    // God camera orbit around its fixed target.
    god_yaw: f32,
    god_pitch: f32,
    dragging: bool,
    last_cursor: Option<Vec2>,

    // Held-key inputs, -1/0/1 per axis.
    advance: f32,
    turn: f32,
    radius_change: f32,
}

impl DemoState {
    pub fn new() -> DemoState {
        let mut god_camera = Camera::new(
            Vec3::new(0.0, 55.0, 50.0),
            Vec3::new(0.0, 32.0, -12.0),
            Vec3::Y,
            60.0,
            0.1,
            512.0,
        );
        god_camera.set_distance(70.0);

        let player_camera = Camera::new(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 9.5, -5.0),
            Vec3::Y,
            45.0,
            1.0,
            150.0,
        );

        let offset = god_camera.eye - god_camera.target;
        let god_pitch = (offset.y / offset.length()).asin();
        let god_yaw = offset.x.atan2(offset.z);

        DemoState {
            god_camera,
            player_camera,
            slime: SlimeTrajectory::new(),
            erasing: false,
            erase_radius: DEFAULT_ERASE_RADIUS,
            god_yaw,
            god_pitch,
            dragging: false,
            last_cursor: None,
            advance: 0.0,
            turn: 0.0,
            radius_change: 0.0,
        }
    }

    pub fn update(&mut self, delta_seconds: f32) {
        self.player_camera
            .advance(self.advance * PLAYER_MOVE_SPEED * delta_seconds);
        self.player_camera
            .yaw_around_eye(self.turn * PLAYER_TURN_SPEED * delta_seconds);
        self.erase_radius = (self.erase_radius
            + self.radius_change * ERASE_RADIUS_RATE * delta_seconds)
            .clamp(0.0, MAX_ERASE_RADIUS);

        self.slime.update(delta_seconds);

        let direction = Vec3::new(
            self.god_pitch.cos() * self.god_yaw.sin(),
            self.god_pitch.sin(),
            self.god_pitch.cos() * self.god_yaw.cos(),
        );
        self.god_camera.eye = self.god_camera.target + direction * self.god_camera.distance();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        // Each camera renders to one half of the window.
        self.god_camera.resize(width, height / 2);
        self.player_camera.resize(width, height / 2);
    }

    /// Position the cull kernel erases around. Follows the slime.
    pub fn agent_position(&self) -> Vec3 {
        self.slime.position()
    }

    /// Zero radius erases nothing, so toggling off needs no kernel change.
    pub fn erase_radius(&self) -> f32 {
        if self.erasing {
            self.erase_radius
        } else {
            0.0
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        let axis = |active: bool, value: f32| if active { value } else { 0.0 };
        match key {
            KeyCode::KeyW => self.advance = axis(pressed, 1.0),
            KeyCode::KeyS => self.advance = axis(pressed, -1.0),
            KeyCode::KeyA => self.turn = axis(pressed, 1.0),
            KeyCode::KeyD => self.turn = axis(pressed, -1.0),
            KeyCode::KeyQ => self.radius_change = axis(pressed, -1.0),
            KeyCode::KeyE => self.radius_change = axis(pressed, 1.0),
            KeyCode::Space if pressed => self.erasing = !self.erasing,
            KeyCode::KeyT if pressed => self.slime.enable(true),
            _ => {}
        }
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if button == MouseButton::Left {
            self.dragging = pressed;
            if !pressed {
                self.last_cursor = None;
            }
        }
    }

    pub fn handle_cursor(&mut self, position: Vec2) {
        if self.dragging {
            if let Some(last) = self.last_cursor {
                let delta = (position - last) * TRACKBALL_SENSITIVITY;
                self.god_yaw -= delta.x;
                self.god_pitch = (self.god_pitch + delta.y).clamp(-PITCH_LIMIT, PITCH_LIMIT);
            }
            self.last_cursor = Some(position);
        }
    }

    pub fn handle_scroll(&mut self, delta: f32) {
        self.god_camera.add_distance(-delta * ZOOM_STEP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erase_radius_follows_toggle() {
        let mut state = DemoState::new();
        assert_eq!(state.erase_radius(), 0.0);
        state.handle_key(KeyCode::Space, true);
        assert_eq!(state.erase_radius(), DEFAULT_ERASE_RADIUS);
        state.handle_key(KeyCode::Space, true);
        assert_eq!(state.erase_radius(), 0.0);
    }

    #[test]
    fn erase_radius_adjusts_while_key_held() {
        let mut state = DemoState::new();
        state.handle_key(KeyCode::Space, true);
        state.handle_key(KeyCode::KeyE, true);
        state.update(1.0);
        assert!(state.erase_radius() > DEFAULT_ERASE_RADIUS);

        state.handle_key(KeyCode::KeyE, false);
        state.handle_key(KeyCode::KeyQ, true);
        state.update(100.0);
        assert_eq!(state.erase_radius(), 0.0);
    }

    #[test]
    fn key_release_stops_movement() {
        let mut state = DemoState::new();
        let eye_before = state.player_camera.eye;

        state.handle_key(KeyCode::KeyW, true);
        state.update(0.1);
        let eye_moving = state.player_camera.eye;
        assert_ne!(eye_moving, eye_before);

        state.handle_key(KeyCode::KeyW, false);
        state.update(0.1);
        assert_eq!(state.player_camera.eye, eye_moving);
    }

    #[test]
    fn trackball_pitch_is_clamped() {
        let mut state = DemoState::new();
        state.handle_mouse_button(MouseButton::Left, true);
        state.handle_cursor(Vec2::ZERO);
        state.handle_cursor(Vec2::new(0.0, 100_000.0));
        state.update(0.016);

        let offset = state.god_camera.eye - state.god_camera.target;
        let pitch = (offset.y / offset.length()).asin();
        assert!(pitch <= PITCH_LIMIT + 1e-4);
    }

    #[test]
    fn orbit_preserves_distance_to_target() {
        let mut state = DemoState::new();
        state.handle_mouse_button(MouseButton::Left, true);
        state.handle_cursor(Vec2::ZERO);
        state.handle_cursor(Vec2::new(300.0, -120.0));
        state.update(0.016);

        let distance = (state.god_camera.eye - state.god_camera.target).length();
        assert!((distance - state.god_camera.distance()).abs() < 1e-3);
    }
}
