//! Ripple Dodge - rhythm-driven pulse dodging on a circle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (beat sources, wave geometry, collision, scoring)
//! - `settings`: Data-driven tuning, loaded from JSON and validated up front

pub mod settings;
pub mod sim;

pub use settings::{Settings, SettingsError, SpeedCurve};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one spectrum frame per tick)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
}

/// Shortest signed difference from `current` to `target` in degrees, in (-180, 180]
#[inline]
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut diff = (target - current).rem_euclid(360.0);
    if diff > 180.0 {
        diff -= 360.0;
    }
    diff
}

/// Convert polar (r, degrees) around `center` to cartesian
#[inline]
pub fn polar_to_cartesian(center: Vec2, r: f32, degrees: f32) -> Vec2 {
    let theta = degrees.to_radians();
    center + Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian to polar (r, degrees) relative to `center`
#[inline]
pub fn cartesian_to_polar(center: Vec2, pos: Vec2) -> (f32, f32) {
    let d = pos - center;
    (d.length(), d.y.atan2(d.x).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_angle_range() {
        assert!((delta_angle(0.0, 90.0) - 90.0).abs() < 1e-4);
        assert!((delta_angle(90.0, 0.0) + 90.0).abs() < 1e-4);
        assert!((delta_angle(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((delta_angle(10.0, 350.0) + 20.0).abs() < 1e-4);
        // Exactly opposite resolves to +180, never -180
        assert!((delta_angle(0.0, 180.0) - 180.0).abs() < 1e-4);
        assert!((delta_angle(180.0, 0.0) - 180.0).abs() < 1e-4);
        assert!(delta_angle(0.0, 720.0).abs() < 1e-4);
    }

    #[test]
    fn test_polar_roundtrip_offset_center() {
        let center = Vec2::new(10.0, -5.0);
        let p = polar_to_cartesian(center, 50.0, 135.0);
        let (r, deg) = cartesian_to_polar(center, p);
        assert!((r - 50.0).abs() < 1e-3);
        assert!((deg - 135.0).abs() < 1e-3);
    }
}
