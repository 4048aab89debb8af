//! Game tuning and configuration
//!
//! Loaded from JSON and validated once at setup. Simulation code assumes a
//! validated `Settings` and never re-checks geometry per tick.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration failures, reported before the first tick
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("wave_width must be > 0 (got {0})")]
    WaveWidth(f32),
    #[error("points must be >= 2 (got {0})")]
    SampleCount(usize),
    #[error("angle_span must be > 0 (got {0})")]
    AngleSpan(f32),
    #[error("base_radius must be > 0 (got {0})")]
    BaseRadius(f32),
    #[error("angular speed range must be positive (got {min}..{max})")]
    AngularSpeed { min: f32, max: f32 },
    #[error("amplitude thresholds must satisfy low <= high (got {low} / {high})")]
    AmplitudeThresholds { low: f32, high: f32 },
    #[error("beat history length must be > 0")]
    HistoryLength,
    #[error("beat_release_multiplier must be > 0 and below beat_multiplier (got {release} / {trigger})")]
    ReleaseBand { release: f32, trigger: f32 },
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("risk_radius must be > 0 (got {0})")]
    RiskRadius(f32),
    #[error("multiplier tier for combo {combo} must have multiplier >= 1")]
    MultiplierTier { combo: u32 },
    #[error("lifetime must be > 0 (got {0})")]
    Lifetime(f32),
    #[error("{0} must be finite and >= 0")]
    Negative(&'static str),
}

/// Energy to angular speed mapping (degrees/second)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeedCurve {
    /// `lerp(min, max, energy)`
    Lerp { min: f32, max: f32 },
    /// `base * lerp(min_multiplier, max_multiplier, energy)`
    BaseMultiplier {
        base: f32,
        min_multiplier: f32,
        max_multiplier: f32,
    },
}

impl SpeedCurve {
    /// Angular speed for a beat of the given energy (clamped to 0..1)
    pub fn speed_for(&self, energy: f32) -> f32 {
        let e = energy.clamp(0.0, 1.0);
        match *self {
            SpeedCurve::Lerp { min, max } => min + (max - min) * e,
            SpeedCurve::BaseMultiplier {
                base,
                min_multiplier,
                max_multiplier,
            } => base * (min_multiplier + (max_multiplier - min_multiplier) * e),
        }
    }

    /// Speeds produced at energy 0 and energy 1
    pub fn range(&self) -> (f32, f32) {
        (self.speed_for(0.0), self.speed_for(1.0))
    }
}

impl Default for SpeedCurve {
    fn default() -> Self {
        SpeedCurve::BaseMultiplier {
            base: 80.0,
            min_multiplier: 0.8,
            max_multiplier: 1.3,
        }
    }
}

/// Weight applied to one spectrum bin in the bass-emphasis filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandWeight {
    pub bin: usize,
    pub weight: f32,
}

/// Low bins dominate, a few mid bins contribute a little
fn default_band_weights() -> Vec<BandWeight> {
    [
        (1, 1.0),
        (2, 1.0),
        (3, 0.8),
        (4, 0.6),
        (6, 0.35),
        (10, 0.2),
        (16, 0.1),
    ]
    .into_iter()
    .map(|(bin, weight)| BandWeight { bin, weight })
    .collect()
}

/// Beat detection and spawn rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatSettings {
    /// Minimum real gap between two spawns (seconds)
    pub min_interval: f32,
    /// Recovery time after a spawn (seconds); the effective gap is the max of both
    pub recovery_time: f32,
    /// No beats are emitted before this much playback time
    pub song_start_delay: f32,

    // === Scripted ===
    /// Beat map entries weaker than this are ignored
    pub min_energy_to_spawn: f32,
    /// 1 = a wave may follow every beat, 2 = at most one every two beats, ...
    pub min_beats_between_spawns: u32,

    // === Adaptive ===
    /// Raw beat when energy exceeds `avg * beat_multiplier`
    pub beat_multiplier: f32,
    /// Latch releases once energy drops below `avg * beat_release_multiplier`
    pub beat_release_multiplier: f32,
    /// Absolute energy floor for a raw beat
    pub min_beat_energy: f32,
    /// Minimum `energy - avg` for a raw beat
    pub min_beat_delta: f32,
    /// Energy history length in frames (~0.5 s)
    pub history_len: usize,
    pub band_weights: Vec<BandWeight>,
}

impl Default for BeatSettings {
    fn default() -> Self {
        Self {
            min_interval: 0.25,
            recovery_time: 0.5,
            song_start_delay: 0.5,
            min_energy_to_spawn: 0.18,
            min_beats_between_spawns: 1,
            beat_multiplier: 1.4,
            beat_release_multiplier: 1.1,
            min_beat_energy: 0.01,
            min_beat_delta: 0.005,
            history_len: 30,
            band_weights: default_band_weights(),
        }
    }
}

impl BeatSettings {
    /// Effective minimum gap between emitted beats
    pub fn min_gap(&self) -> f32 {
        self.min_interval.max(self.recovery_time)
    }
}

/// Wave creation from beats
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    /// Angle (degrees) where the crest starts
    pub start_angle: f32,
    /// Below this energy a wave is small
    pub low_threshold: f32,
    /// At or above this energy a wave is large
    pub high_threshold: f32,
    pub small_amplitude: f32,
    pub medium_amplitude: f32,
    pub large_amplitude: f32,
    pub speed: SpeedCurve,
    /// Explicit lifetime; derived from span and speed when absent
    pub lifetime: Option<f32>,
    /// Slack added to the derived lifetime
    pub lifetime_margin: f32,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            start_angle: 55.0,
            low_threshold: 0.33,
            high_threshold: 0.66,
            small_amplitude: 10.0,
            medium_amplitude: 40.0,
            large_amplitude: 80.0,
            speed: SpeedCurve::default(),
            lifetime: None,
            lifetime_margin: 0.25,
        }
    }
}

/// Wave geometry, shared by rendering and collision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSettings {
    pub base_radius: f32,
    /// Degrees covered by the sampled ring
    pub angle_span: f32,
    /// Sample count across the span
    pub points: usize,
    /// Gaussian width of the pulse (degrees)
    pub wave_width: f32,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            base_radius: 300.0,
            angle_span: 360.0,
            points: 256,
            wave_width: 6.0,
        }
    }
}

/// Hit / evade judgement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSettings {
    /// Max angular distance (degrees) between player and nearest sample
    pub pass_threshold: f32,
    /// Sweep required before any judgement (degrees)
    pub min_angle_before_scoring: f32,
    /// Also wait for the crest itself to reach the player
    pub require_crest_alignment: bool,
    /// Built-in body-vs-polyline overlap channel
    pub overlap_enabled: bool,
    /// Player body radius for the overlap channel
    pub player_radius: f32,
    /// Minimum time between two overlap signals (seconds)
    pub hit_cooldown: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            pass_threshold: 8.0,
            min_angle_before_scoring: 20.0,
            require_crest_alignment: false,
            overlap_enabled: true,
            player_radius: 12.0,
            hit_cooldown: 0.25,
        }
    }
}

/// One stepwise multiplier tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierTier {
    /// Minimum combo for this tier
    pub combo: u32,
    pub multiplier: u32,
}

/// Combo, multiplier and risk tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreSettings {
    pub base_points: u32,
    pub tiers: Vec<MultiplierTier>,
    pub risk_radius: f32,
    pub risk_gain_per_second: f32,
}

impl Default for ScoreSettings {
    fn default() -> Self {
        Self {
            base_points: 10,
            tiers: vec![
                MultiplierTier { combo: 3, multiplier: 2 },
                MultiplierTier { combo: 6, multiplier: 3 },
                MultiplierTier { combo: 10, multiplier: 4 },
            ],
            risk_radius: 400.0,
            risk_gain_per_second: 10.0,
        }
    }
}

/// Complete game tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub beat: BeatSettings,
    pub spawn: SpawnSettings,
    pub wave: WaveSettings,
    pub collision: CollisionSettings,
    pub score: ScoreSettings,
}

impl Settings {
    /// Defaults, but judgement waits for the crest to reach the player
    ///
    /// Lets the body-overlap channel land before the evaluator resolves.
    pub fn crest_aligned() -> Self {
        Self {
            collision: CollisionSettings {
                require_crest_alignment: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject degenerate configuration before any simulation runs
    pub fn validate(&self) -> Result<(), SettingsError> {
        let wave = &self.wave;
        if !(wave.wave_width > 0.0) {
            return Err(SettingsError::WaveWidth(wave.wave_width));
        }
        if wave.points < 2 {
            return Err(SettingsError::SampleCount(wave.points));
        }
        if !(wave.angle_span > 0.0) {
            return Err(SettingsError::AngleSpan(wave.angle_span));
        }
        if !(wave.base_radius > 0.0) {
            return Err(SettingsError::BaseRadius(wave.base_radius));
        }

        let spawn = &self.spawn;
        check_finite("low_threshold", spawn.low_threshold)?;
        check_finite("high_threshold", spawn.high_threshold)?;
        let (min, max) = spawn.speed.range();
        if !(min > 0.0 && max > 0.0) || !min.is_finite() || !max.is_finite() {
            return Err(SettingsError::AngularSpeed { min, max });
        }
        if spawn.low_threshold > spawn.high_threshold {
            return Err(SettingsError::AmplitudeThresholds {
                low: spawn.low_threshold,
                high: spawn.high_threshold,
            });
        }
        if let Some(lifetime) = spawn.lifetime
            && !(lifetime > 0.0)
        {
            return Err(SettingsError::Lifetime(lifetime));
        }
        check_non_negative("lifetime_margin", spawn.lifetime_margin)?;

        let beat = &self.beat;
        if beat.history_len == 0 {
            return Err(SettingsError::HistoryLength);
        }
        check_non_negative("min_interval", beat.min_interval)?;
        check_non_negative("recovery_time", beat.recovery_time)?;
        check_non_negative("song_start_delay", beat.song_start_delay)?;
        check_finite("min_beat_energy", beat.min_beat_energy)?;
        check_finite("min_beat_delta", beat.min_beat_delta)?;
        // The latch must release strictly below the trigger level
        if !(beat.beat_release_multiplier > 0.0
            && beat.beat_release_multiplier < beat.beat_multiplier)
            || !beat.beat_multiplier.is_finite()
        {
            return Err(SettingsError::ReleaseBand {
                release: beat.beat_release_multiplier,
                trigger: beat.beat_multiplier,
            });
        }

        let collision = &self.collision;
        check_non_negative("pass_threshold", collision.pass_threshold)?;
        check_non_negative("min_angle_before_scoring", collision.min_angle_before_scoring)?;
        check_non_negative("player_radius", collision.player_radius)?;
        check_non_negative("hit_cooldown", collision.hit_cooldown)?;

        let score = &self.score;
        if !(score.risk_radius > 0.0) {
            return Err(SettingsError::RiskRadius(score.risk_radius));
        }
        check_non_negative("risk_gain_per_second", score.risk_gain_per_second)?;
        if let Some(tier) = score.tiers.iter().find(|t| t.multiplier == 0) {
            return Err(SettingsError::MultiplierTier { combo: tier.combo });
        }

        Ok(())
    }
}

fn check_finite(name: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::NonFinite(name))
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Negative(name))
    }
}
