//! Session state and the active-wave registry
//!
//! `GameState` is the explicit context handed to `tick`: it owns the beat
//! source, the component configuration, the wave registry and the score.
//! Nothing lives in globals.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::beat::{BeatEvent, BeatMap, BeatSource, ScriptedBeatSource};
use super::collision::{CollisionEvaluator, OverlapDetector};
use super::score::{EvadeAward, ScoreEngine, ScoreState};
use super::spawner::WaveSpawner;
use super::wave::{WaveId, WaveLaunch, WaveState};
use crate::settings::{Settings, SettingsError};

/// Notifications for rendering and feedback collaborators, one tick's worth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A beat passed the gate this tick
    Beat(BeatEvent),
    /// New wave registered; geometry for the renderer
    WaveSpawned { id: WaveId, launch: WaveLaunch },
    /// Physical overlap latched the wave's hit flag
    WaveOverlap { id: WaveId },
    WaveEvaded { id: WaveId, award: EvadeAward },
    WaveHit { id: WaveId },
    /// Lifetime elapsed, wave left the registry
    WaveExpired { id: WaveId },
}

/// End-of-run numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub score: u64,
    pub max_combo: u32,
    pub waves_evaded: u32,
}

/// Complete session state
pub struct GameState {
    pub settings: Settings,
    /// Shared center reference for wave geometry
    pub center: Vec2,
    pub(crate) beats: Box<dyn BeatSource>,
    pub(crate) spawner: WaveSpawner,
    pub(crate) evaluator: CollisionEvaluator,
    pub(crate) overlap: OverlapDetector,
    pub(crate) score: ScoreEngine,
    /// Active waves (sorted by id for determinism)
    pub(crate) waves: Vec<WaveState>,
    /// Simulation clock (seconds)
    pub time: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events produced by the last tick
    pub events: Vec<GameEvent>,
    next_id: WaveId,
}

impl GameState {
    /// Validate the settings and build every component from them
    pub fn new(
        settings: Settings,
        center: Vec2,
        beats: Box<dyn BeatSource>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            spawner: WaveSpawner::new(&settings.spawn, &settings.wave),
            evaluator: CollisionEvaluator::new(&settings.collision),
            overlap: OverlapDetector::new(&settings.collision),
            score: ScoreEngine::new(&settings.score),
            settings,
            center,
            beats,
            waves: Vec::new(),
            time: 0.0,
            time_ticks: 0,
            events: Vec::new(),
            next_id: 1,
        })
    }

    /// Session driven by a scripted beat map
    pub fn with_beat_map(
        settings: Settings,
        center: Vec2,
        map: BeatMap,
    ) -> Result<Self, SettingsError> {
        let source = ScriptedBeatSource::new(map, &settings.beat);
        Self::new(settings, center, Box::new(source))
    }

    /// Allocate a new wave ID
    pub fn next_wave_id(&mut self) -> WaveId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a wave to the active registry
    pub fn register_wave(&mut self, wave: WaveState) {
        self.waves.push(wave);
        self.normalize_order();
    }

    /// Remove a wave from the active registry
    pub fn unregister_wave(&mut self, id: WaveId) -> Option<WaveState> {
        let index = self.waves.iter().position(|w| w.id == id)?;
        Some(self.waves.remove(index))
    }

    pub fn waves(&self) -> &[WaveState] {
        &self.waves
    }

    pub fn wave(&self, id: WaveId) -> Option<&WaveState> {
        self.waves.iter().find(|w| w.id == id)
    }

    pub fn wave_mut(&mut self, id: WaveId) -> Option<&mut WaveState> {
        self.waves.iter_mut().find(|w| w.id == id)
    }

    pub fn spawner(&self) -> &WaveSpawner {
        &self.spawner
    }

    pub fn score(&self) -> &ScoreState {
        self.score.state()
    }

    pub fn score_engine(&self) -> &ScoreEngine {
        &self.score
    }

    pub fn summary(&self) -> RunSummary {
        let s = self.score.state();
        RunSummary {
            score: s.score,
            max_combo: s.max_combo,
            waves_evaded: s.waves_evaded,
        }
    }

    /// Ensure waves are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.waves.sort_by_key(|w| w.id);
    }
}
