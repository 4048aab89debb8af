//! Combo, multiplier and risk scoring
//!
//! Single writer for `ScoreState`. Evasions build combo and pay out the
//! accumulated risk; hits only reset combo and risk.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::{MultiplierTier, ScoreSettings};

/// Numeric telemetry exposed to UI collaborators
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub waves_evaded: u32,
    /// Pending proximity bonus, >= 0
    pub risk_current: f32,
    /// Multiplier for the current combo
    pub multiplier: u32,
}

/// Points awarded for one evasion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvadeAward {
    pub multiplier: u32,
    pub wave_score: u64,
    pub risk_score: u64,
}

impl EvadeAward {
    pub fn total(&self) -> u64 {
        self.wave_score + self.risk_score
    }
}

#[derive(Debug, Clone)]
pub struct ScoreEngine {
    base_points: u32,
    /// Sorted by combo threshold, highest first
    tiers: Vec<MultiplierTier>,
    risk_radius: f32,
    risk_gain_per_second: f32,
    state: ScoreState,
}

impl ScoreEngine {
    pub fn new(settings: &ScoreSettings) -> Self {
        let mut tiers = settings.tiers.clone();
        tiers.sort_by(|a, b| b.combo.cmp(&a.combo));
        let mut engine = Self {
            base_points: settings.base_points,
            tiers,
            risk_radius: settings.risk_radius,
            risk_gain_per_second: settings.risk_gain_per_second,
            state: ScoreState::default(),
        };
        engine.state.multiplier = engine.multiplier_for(0);
        engine
    }

    /// Stepwise multiplier: highest matching tier wins, 1x below every tier
    pub fn multiplier_for(&self, combo: u32) -> u32 {
        self.tiers
            .iter()
            .find(|tier| combo >= tier.combo)
            .map_or(1, |tier| tier.multiplier)
    }

    pub fn state(&self) -> &ScoreState {
        &self.state
    }

    /// Copy of the current telemetry
    pub fn snapshot(&self) -> ScoreState {
        self.state
    }

    pub fn score(&self) -> u64 {
        self.state.score
    }

    pub fn combo(&self) -> u32 {
        self.state.combo
    }

    pub fn risk(&self) -> f32 {
        self.state.risk_current
    }

    /// Wave cleared: bump combo, pay base points and risk at the new multiplier
    pub fn on_evaded(&mut self) -> EvadeAward {
        let s = &mut self.state;
        s.combo += 1;
        s.max_combo = s.max_combo.max(s.combo);
        s.waves_evaded += 1;

        let multiplier = self.multiplier_for(self.state.combo);
        let wave_score = self.base_points as u64 * multiplier as u64;
        let risk_score = (self.state.risk_current * multiplier as f32).round().max(0.0) as u64;

        let s = &mut self.state;
        s.score += wave_score + risk_score;
        s.risk_current = 0.0;
        s.multiplier = multiplier;

        log::info!(
            "[WAVE EVADED] Combo: {}  Added: {}  Total: {}",
            s.combo,
            wave_score + risk_score,
            s.score
        );

        EvadeAward {
            multiplier,
            wave_score,
            risk_score,
        }
    }

    /// Wave hit the player: combo and pending risk are lost, score is kept
    pub fn on_hit(&mut self) {
        self.state.combo = 0;
        self.state.risk_current = 0.0;
        self.state.multiplier = self.multiplier_for(0);
        log::info!("[WAVE HIT] Combo reset.");
    }

    /// Accrue risk from the closest anchor; linear ramp from full gain at
    /// distance 0 to nothing at `risk_radius`
    ///
    /// Returns the amount added.
    pub fn accrue_risk<I>(&mut self, player: Vec2, anchors: I, dt: f32) -> f32
    where
        I: IntoIterator<Item = Vec2>,
    {
        let min_dist = anchors
            .into_iter()
            .map(|anchor| player.distance(anchor))
            .fold(f32::MAX, f32::min);

        if min_dist > self.risk_radius {
            return 0.0;
        }

        let factor = 1.0 - min_dist / self.risk_radius;
        let gain = (self.risk_gain_per_second * factor * dt).max(0.0);
        self.state.risk_current += gain;
        gain
    }
}
