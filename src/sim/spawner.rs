//! Beat → wave conversion
//!
//! Energy picks one of three amplitude tiers and maps onto an angular speed.
//! Without an explicit lifetime a wave lives long enough to sweep its whole
//! span, plus a small margin.

use glam::Vec2;

use super::beat::BeatEvent;
use super::wave::{WaveId, WaveLaunch, WaveState};
use crate::settings::{SpawnSettings, SpeedCurve, WaveSettings};

/// Amplitude tier chosen from beat energy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplitudeTier {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone)]
pub struct WaveSpawner {
    spawn: SpawnSettings,
    geometry: WaveSettings,
}

impl WaveSpawner {
    pub fn new(spawn: &SpawnSettings, geometry: &WaveSettings) -> Self {
        Self {
            spawn: spawn.clone(),
            geometry: geometry.clone(),
        }
    }

    pub fn tier_for(&self, energy: f32) -> AmplitudeTier {
        if energy < self.spawn.low_threshold {
            AmplitudeTier::Small
        } else if energy < self.spawn.high_threshold {
            AmplitudeTier::Medium
        } else {
            AmplitudeTier::Large
        }
    }

    pub fn amplitude_for(&self, energy: f32) -> f32 {
        match self.tier_for(energy) {
            AmplitudeTier::Small => self.spawn.small_amplitude,
            AmplitudeTier::Medium => self.spawn.medium_amplitude,
            AmplitudeTier::Large => self.spawn.large_amplitude,
        }
    }

    pub fn speed_for(&self, energy: f32) -> f32 {
        self.spawn.speed.speed_for(energy)
    }

    pub fn speed_curve(&self) -> SpeedCurve {
        self.spawn.speed
    }

    /// Explicit lifetime, or the time to sweep the span plus the margin
    pub fn lifetime_for(&self, angular_speed: f32) -> f32 {
        self.spawn
            .lifetime
            .unwrap_or(self.geometry.angle_span / angular_speed + self.spawn.lifetime_margin)
    }

    /// Launch parameters for a beat
    pub fn launch_for(&self, beat: &BeatEvent, now: f32) -> WaveLaunch {
        let angular_speed = self.speed_for(beat.energy);
        WaveLaunch {
            start_angle: self.spawn.start_angle,
            amplitude: self.amplitude_for(beat.energy),
            angular_speed,
            spawn_time: now,
            lifetime: self.lifetime_for(angular_speed),
        }
    }

    /// Build a fresh, unresolved wave for a beat
    pub fn spawn(&self, id: WaveId, center: Vec2, beat: &BeatEvent, now: f32) -> WaveState {
        let launch = self.launch_for(beat, now);
        log::debug!(
            "Spawn wave {}: amplitude {:.0}, speed {:.1} deg/s, lifetime {:.2}s",
            id,
            launch.amplitude,
            launch.angular_speed,
            launch.lifetime
        );
        WaveState::new(id, center, &self.geometry, launch)
    }
}
