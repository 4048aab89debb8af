//! Traveling pulse geometry
//!
//! A wave is a ring of fixed `base_radius` sampled at evenly spaced angles
//! across `angle_span`. A single Gaussian bump of radial displacement rides
//! the ring, centered on `current_angle`:
//! - pulse(diff) = amplitude * exp(-diff² / (2 * width²))
//! - sample radius = base_radius + pulse
//!
//! The sampled radii are the authoritative shape, used for drawing and for
//! every collision test.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::WaveSettings;
use crate::{delta_angle, polar_to_cartesian};

/// Stable wave identifier, unique per session
pub type WaveId = u32;

/// Per-wave launch parameters chosen by the spawner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveLaunch {
    /// Crest angle at spawn (degrees)
    pub start_angle: f32,
    pub amplitude: f32,
    /// Degrees per second
    pub angular_speed: f32,
    /// Simulation time at spawn (seconds)
    pub spawn_time: f32,
    /// Seconds until forced removal
    pub lifetime: f32,
}

/// A live pulse in the active-wave registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveState {
    pub id: WaveId,
    /// Shared center reference (also the wave's anchor)
    pub center: Vec2,
    pub base_radius: f32,
    /// Degrees covered by the samples, starting at 0°
    pub angle_span: f32,
    pub start_angle: f32,
    /// Crest angle (degrees, unwrapped)
    pub current_angle: f32,
    pub angular_speed: f32,
    pub amplitude: f32,
    pub wave_width: f32,
    pub spawn_time: f32,
    pub lifetime: f32,
    /// Seconds since spawn
    pub age: f32,
    resolved: bool,
    hit_flag: bool,
    /// Sample radii (base + pulse), one per sample index
    radii: Vec<f32>,
}

impl WaveState {
    pub fn new(id: WaveId, center: Vec2, geometry: &WaveSettings, launch: WaveLaunch) -> Self {
        let mut wave = Self {
            id,
            center,
            base_radius: geometry.base_radius,
            angle_span: geometry.angle_span,
            start_angle: launch.start_angle,
            current_angle: launch.start_angle,
            angular_speed: launch.angular_speed,
            amplitude: launch.amplitude,
            wave_width: geometry.wave_width,
            spawn_time: launch.spawn_time,
            lifetime: launch.lifetime,
            age: 0.0,
            resolved: false,
            hit_flag: false,
            radii: vec![geometry.base_radius; geometry.points],
        };
        wave.rebuild_shape();
        wave
    }

    /// Launch parameters this wave was created with
    pub fn launch(&self) -> WaveLaunch {
        WaveLaunch {
            start_angle: self.start_angle,
            amplitude: self.amplitude,
            angular_speed: self.angular_speed,
            spawn_time: self.spawn_time,
            lifetime: self.lifetime,
        }
    }

    /// Number of samples across the span
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.radii.len()
    }

    /// Base angle of a sample index (degrees)
    #[inline]
    pub fn sample_angle(&self, index: usize) -> f32 {
        let t = index as f32 / (self.sample_count() - 1).max(1) as f32;
        t * self.angle_span
    }

    /// Radial displacement at `angle` for the current crest position
    #[inline]
    pub fn pulse_at(&self, angle: f32) -> f32 {
        let diff = delta_angle(angle, self.current_angle);
        self.amplitude * (-(diff * diff) / (2.0 * self.wave_width * self.wave_width)).exp()
    }

    /// Sample radius (base + pulse) at an index
    #[inline]
    pub fn radius_at(&self, index: usize) -> f32 {
        self.radii[index]
    }

    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    /// Sample position in world space
    pub fn sample_point(&self, index: usize) -> Vec2 {
        polar_to_cartesian(self.center, self.radii[index], self.sample_angle(index))
    }

    /// All sample positions, in index order (for rendering or debugging)
    pub fn sample_points(&self) -> Vec<Vec2> {
        (0..self.sample_count()).map(|i| self.sample_point(i)).collect()
    }

    /// Recompute the sampled shape from the current crest angle
    pub fn rebuild_shape(&mut self) {
        for i in 0..self.radii.len() {
            let angle = self.sample_angle(i);
            self.radii[i] = self.base_radius + self.pulse_at(angle);
        }
    }

    /// Move the crest and age the wave by one tick
    pub fn advance(&mut self, dt: f32) {
        self.current_angle += self.angular_speed * dt;
        self.age += dt;
        self.rebuild_shape();
    }

    /// Degrees travelled since spawn
    #[inline]
    pub fn swept(&self) -> f32 {
        (self.current_angle - self.start_angle).abs()
    }

    /// Crest angle normalized to [0, 360)
    #[inline]
    pub fn crest_angle(&self) -> f32 {
        self.current_angle.rem_euclid(360.0)
    }

    /// Position used for proximity (risk) checks
    #[inline]
    pub fn anchor(&self) -> Vec2 {
        self.center
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.age > self.lifetime
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    #[inline]
    pub fn hit_flag(&self) -> bool {
        self.hit_flag
    }

    /// Set the terminal flag; returns false if it was already set
    pub fn resolve(&mut self) -> bool {
        !std::mem::replace(&mut self.resolved, true)
    }

    /// Latch the hit flag; it is never cleared
    pub fn mark_hit(&mut self) {
        self.hit_flag = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn launch(start_angle: f32, amplitude: f32) -> WaveLaunch {
        WaveLaunch {
            start_angle,
            amplitude,
            angular_speed: 90.0,
            spawn_time: 0.0,
            lifetime: 4.0,
        }
    }

    fn geometry() -> WaveSettings {
        WaveSettings {
            base_radius: 100.0,
            angle_span: 360.0,
            points: 361,
            wave_width: 6.0,
        }
    }

    #[test]
    fn test_peak_at_crest() {
        let wave = WaveState::new(1, Vec2::ZERO, &geometry(), launch(90.0, 40.0));
        // 361 samples over 360° puts index 90 exactly at 90°
        assert!((wave.sample_angle(90) - 90.0).abs() < 1e-4);
        assert!((wave.radius_at(90) - 140.0).abs() < 1e-3);
        // Far from the crest the ring is flat
        assert!((wave.radius_at(270) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_pulse_is_symmetric_and_decays() {
        let wave = WaveState::new(1, Vec2::ZERO, &geometry(), launch(180.0, 40.0));
        let left = wave.pulse_at(174.0);
        let right = wave.pulse_at(186.0);
        assert!((left - right).abs() < 1e-4);
        // One width away: amplitude * e^-0.5
        assert!((left - 40.0 * (-0.5f32).exp()).abs() < 1e-3);
        assert!(wave.pulse_at(150.0) < left);
    }

    #[test]
    fn test_pulse_wraps_across_zero() {
        let wave = WaveState::new(1, Vec2::ZERO, &geometry(), launch(358.0, 40.0));
        // 2° past 0 is 4° from the crest
        let across = wave.pulse_at(2.0);
        let same_side = wave.pulse_at(354.0);
        assert!((across - same_side).abs() < 1e-3);
    }

    #[test]
    fn test_advance_moves_crest() {
        let mut wave = WaveState::new(1, Vec2::ZERO, &geometry(), launch(0.0, 40.0));
        wave.advance(0.5);
        assert!((wave.current_angle - 45.0).abs() < 1e-4);
        assert!((wave.swept() - 45.0).abs() < 1e-4);
        assert!((wave.radius_at(45) - 140.0).abs() < 1e-3);
        assert!(!wave.is_expired());
        for _ in 0..8 {
            wave.advance(0.5);
        }
        assert!(wave.is_expired());
    }

    #[test]
    fn test_sample_points_offset_center() {
        let center = Vec2::new(50.0, 50.0);
        let wave = WaveState::new(1, center, &geometry(), launch(180.0, 0.0));
        let p = wave.sample_point(0);
        assert!((p - Vec2::new(150.0, 50.0)).length() < 1e-3);
        assert_eq!(wave.sample_points().len(), 361);
    }

    #[test]
    fn test_launch_survives_advance() {
        let params = launch(30.0, 40.0);
        let mut wave = WaveState::new(1, Vec2::ZERO, &geometry(), params);
        wave.advance(0.5);
        assert_eq!(wave.launch(), params);
    }

    #[test]
    fn test_flags_are_monotonic() {
        let mut wave = WaveState::new(1, Vec2::ZERO, &geometry(), launch(0.0, 10.0));
        assert!(wave.resolve());
        assert!(!wave.resolve());
        assert!(wave.is_resolved());
        wave.mark_hit();
        wave.mark_hit();
        assert!(wave.hit_flag());
    }

    proptest! {
        #[test]
        fn prop_crest_displacement_is_full_amplitude(
            crest in -720.0f32..720.0,
            amplitude in 0.0f32..200.0,
            base_radius in 1.0f32..1000.0,
            width in 0.5f32..60.0,
        ) {
            let geometry = WaveSettings { base_radius, angle_span: 360.0, points: 64, wave_width: width };
            let wave = WaveState::new(1, Vec2::ZERO, &geometry, launch(crest, amplitude));
            let r = base_radius + wave.pulse_at(crest);
            prop_assert!((r - (base_radius + amplitude)).abs() <= 1e-3 * (1.0 + amplitude));
        }
    }
}
