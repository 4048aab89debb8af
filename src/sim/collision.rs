//! Hit / evade judgement for traveling pulses
//!
//! Two signals decide whether a wave hit the player:
//! - the evaluator: angular nearest-sample search, then a radial comparison
//!   of the player against the sampled pulse radius at that angle
//! - the physical-overlap channel: the player's body circle touching the
//!   sampled polyline
//!
//! Either one latches the wave's `hit_flag`; the evaluator alone resolves.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::sdf::circle_overlaps_polyline;
use super::wave::{WaveId, WaveState};
use crate::settings::CollisionSettings;
use crate::{cartesian_to_polar, delta_angle};

/// Read-only view of the player supplied by the movement collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub position: Vec2,
    /// Shared center reference, the same one waves are spawned around
    pub center: Vec2,
}

impl PlayerRef {
    /// (radial distance, angle in degrees) relative to the center
    #[inline]
    pub fn polar(&self) -> (f32, f32) {
        cartesian_to_polar(self.center, self.position)
    }
}

/// Terminal result for a wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Hit,
    Evaded,
}

/// Result of one evaluator pass over one wave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Wave was already resolved, nothing to do
    Settled,
    /// Not judgeable this tick; retry next tick
    Deferred,
    /// Newly resolved this tick
    Resolved(Outcome),
}

/// Closest sample to an angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestSample {
    pub index: usize,
    /// Absolute angular distance (degrees)
    pub distance: f32,
}

/// Linear scan for the sample closest in angle; the lowest index wins ties
pub fn nearest_sample(wave: &WaveState, angle: f32) -> NearestSample {
    let mut best = NearestSample {
        index: 0,
        distance: f32::MAX,
    };
    for index in 0..wave.sample_count() {
        let distance = delta_angle(wave.sample_angle(index), angle).abs();
        if distance < best.distance {
            best = NearestSample { index, distance };
        }
    }
    best
}

/// Angular/radial judge, applied once per tick per unresolved wave
#[derive(Debug, Clone)]
pub struct CollisionEvaluator {
    pass_threshold: f32,
    min_angle_before_scoring: f32,
    require_crest_alignment: bool,
}

impl CollisionEvaluator {
    pub fn new(settings: &CollisionSettings) -> Self {
        Self {
            pass_threshold: settings.pass_threshold,
            min_angle_before_scoring: settings.min_angle_before_scoring,
            require_crest_alignment: settings.require_crest_alignment,
        }
    }

    /// Judge a wave against the player
    ///
    /// A player radially inside the pulse (`r <= sample radius`) is hit.
    /// Otherwise the wave is cleared, but a hit flag already latched by the
    /// overlap channel turns the outcome into a hit.
    pub fn evaluate(&self, wave: &mut WaveState, player: &PlayerRef) -> Evaluation {
        if wave.is_resolved() {
            return Evaluation::Settled;
        }

        // No judgement right after spawn
        if wave.swept() < self.min_angle_before_scoring {
            return Evaluation::Deferred;
        }

        let (player_radius, player_angle) = player.polar();
        let nearest = nearest_sample(wave, player_angle);
        if nearest.distance > self.pass_threshold {
            return Evaluation::Deferred;
        }

        if self.require_crest_alignment
            && delta_angle(wave.crest_angle(), player_angle).abs() > self.pass_threshold
        {
            return Evaluation::Deferred;
        }

        let wave_radius = wave.radius_at(nearest.index);
        wave.resolve();

        if player_radius <= wave_radius {
            wave.mark_hit();
            Evaluation::Resolved(Outcome::Hit)
        } else if wave.hit_flag() {
            Evaluation::Resolved(Outcome::Hit)
        } else {
            Evaluation::Resolved(Outcome::Evaded)
        }
    }
}

/// Body-versus-shape overlap, with a per-player hit cooldown
#[derive(Debug, Clone)]
pub struct OverlapDetector {
    enabled: bool,
    player_radius: f32,
    cooldown: f32,
    last_hit: Option<f32>,
}

impl OverlapDetector {
    pub fn new(settings: &CollisionSettings) -> Self {
        Self {
            enabled: settings.overlap_enabled,
            player_radius: settings.player_radius,
            cooldown: settings.hit_cooldown,
            last_hit: None,
        }
    }

    fn cooled_down(&self, now: f32) -> bool {
        self.last_hit.is_none_or(|last| now - last >= self.cooldown)
    }

    /// Whether the player's body touches the wave's sampled shape
    pub fn touches(&self, wave: &WaveState, player: &PlayerRef) -> bool {
        let (r, _) = player.polar();
        // Radial band reject before the polyline walk
        let outer = wave.base_radius + wave.amplitude.max(0.0) + self.player_radius;
        let inner = wave.base_radius + wave.amplitude.min(0.0) - self.player_radius;
        if r > outer || r < inner {
            return false;
        }
        circle_overlaps_polyline(player.position, self.player_radius, &wave.sample_points())
    }

    /// Latch `hit_flag` on waves the player overlaps; returns newly flagged ids
    pub fn detect(&mut self, waves: &mut [WaveState], player: &PlayerRef, now: f32) -> Vec<WaveId> {
        let mut flagged = Vec::new();
        if !self.enabled {
            return flagged;
        }

        for wave in waves.iter_mut() {
            if wave.hit_flag() || !self.cooled_down(now) {
                continue;
            }
            if self.touches(wave, player) {
                wave.mark_hit();
                self.last_hit = Some(now);
                flagged.push(wave.id);
            }
        }

        flagged
    }
}
