use glam::Vec3;

/// Wandering path for the slime agent. The orchestrator advances it once
/// per frame; the culling stage and the slime renderer only read the
/// resulting position.
pub struct SlimeTrajectory {
    enabled: bool,
    time: f32,
}

impl SlimeTrajectory {
    pub fn new() -> SlimeTrajectory {
        SlimeTrajectory {
            enabled: false,
            time: 0.0,
        }
    }

    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn update(&mut self, delta_seconds: f32) {
        if self.enabled {
            self.time += delta_seconds;
        }
    }

    /// Lissajous-style roaming over the foliage field with a small hop.
    pub fn position(&self) -> Vec3 {
        let t = self.time;
        let x = 26.0 * (0.31 * t).sin();
        let z = -18.0 + 14.0 * (0.47 * t).sin() * (0.11 * t).cos();
        let y = 1.2 + 0.35 * (2.9 * t).sin().abs();
        Vec3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_trajectory_holds_position() {
        let mut trajectory = SlimeTrajectory::new();
        let start = trajectory.position();
        trajectory.update(5.0);
        assert_eq!(trajectory.position(), start);
    }

    #[test]
    fn enabled_trajectory_moves_and_stays_in_bounds() {
        let mut trajectory = SlimeTrajectory::new();
        trajectory.enable(true);
        let start = trajectory.position();

        for _ in 0..600 {
            trajectory.update(0.016);
            let p = trajectory.position();
            assert!(p.x.abs() <= 26.0 + 1e-3);
            assert!(p.z >= -32.0 - 1e-3 && p.z <= -4.0 + 1e-3);
            assert!(p.y >= 1.2 - 1e-3 && p.y <= 1.55 + 1e-3);
        }

        assert_ne!(trajectory.position(), start);
    }
}
