//! Beat sources: turn a beat map or live spectrum into rate-limited spawn triggers
//!
//! Every source shares the same gate:
//! - nothing before playback starts or before `song_start_delay`
//! - at most one event per poll
//! - consecutive events at least `max(min_interval, recovery_time)` apart

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::{BandWeight, BeatSettings};

/// A discrete spawn trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Playback time at emission (seconds)
    pub time: f32,
    /// Normalized strength (0..1)
    pub energy: f32,
}

/// Per-tick view of the playback clock and analysis data
#[derive(Debug, Clone, Copy, Default)]
pub struct BeatFrame<'a> {
    /// Elapsed playback time (seconds, monotonic)
    pub song_time: f32,
    pub is_playing: bool,
    /// Frequency magnitudes for this analysis window (adaptive sources only)
    pub spectrum: Option<&'a [f32]>,
}

/// Common contract for scripted and live beat producers
pub trait BeatSource {
    /// Advance to this frame, returning at most one accepted beat
    fn poll(&mut self, frame: &BeatFrame<'_>) -> Option<BeatEvent>;
}

/// Beat map and tempo failures
#[derive(Debug, Error)]
pub enum BeatMapError {
    #[error("failed to read beat map: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse beat map: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("beat {index} has a non-finite time or energy")]
    NonFinite { index: usize },
    #[error("beat {index} at {time}s is earlier than the previous beat")]
    Unsorted { index: usize, time: f32 },
    #[error("tempo must be > 0 bpm (got {0})")]
    Tempo(f32),
}

/// Start delay and minimum-gap limiter shared by all sources
#[derive(Debug, Clone)]
pub struct SpawnGate {
    song_start_delay: f32,
    min_gap: f32,
    last_spawn: Option<f32>,
}

impl SpawnGate {
    pub fn new(settings: &BeatSettings) -> Self {
        Self {
            song_start_delay: settings.song_start_delay,
            min_gap: settings.min_gap(),
            last_spawn: None,
        }
    }

    /// Playback running and past the start delay
    pub fn is_open(&self, frame: &BeatFrame<'_>) -> bool {
        frame.is_playing && frame.song_time >= self.song_start_delay
    }

    /// Enough time since the last accepted beat
    pub fn ready(&self, now: f32) -> bool {
        self.last_spawn.is_none_or(|last| now - last >= self.min_gap)
    }

    pub fn mark(&mut self, now: f32) {
        self.last_spawn = Some(now);
    }

    pub fn last_spawn(&self) -> Option<f32> {
        self.last_spawn
    }
}

/// One beat map record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEntry {
    /// Seconds into the song
    pub time: f32,
    /// 0..1
    pub energy: f32,
}

/// Precomputed beat map (`{ "bpm": 120, "beats": [{ "time": 1.0, "energy": 0.5 }, ...] }`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeatMap {
    /// Informational only
    #[serde(default)]
    pub bpm: f32,
    #[serde(default)]
    pub beats: Vec<BeatEntry>,
}

impl BeatMap {
    pub fn from_json(json: &str) -> Result<Self, BeatMapError> {
        let map: BeatMap = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BeatMapError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Entries must be finite and ascending in time
    pub fn validate(&self) -> Result<(), BeatMapError> {
        let mut prev = f32::NEG_INFINITY;
        for (index, entry) in self.beats.iter().enumerate() {
            if !entry.time.is_finite() || !entry.energy.is_finite() {
                return Err(BeatMapError::NonFinite { index });
            }
            if entry.time < prev {
                return Err(BeatMapError::Unsorted {
                    index,
                    time: entry.time,
                });
            }
            prev = entry.time;
        }
        Ok(())
    }
}

/// Reads a beat map with a forward-only cursor
#[derive(Debug, Clone)]
pub struct ScriptedBeatSource {
    map: BeatMap,
    cursor: usize,
    last_spawn_index: Option<usize>,
    min_energy_to_spawn: f32,
    min_beats_between_spawns: usize,
    gate: SpawnGate,
}

impl ScriptedBeatSource {
    pub fn new(map: BeatMap, settings: &BeatSettings) -> Self {
        Self {
            map,
            cursor: 0,
            last_spawn_index: None,
            min_energy_to_spawn: settings.min_energy_to_spawn,
            min_beats_between_spawns: settings.min_beats_between_spawns as usize,
            gate: SpawnGate::new(settings),
        }
    }

    /// A source that never emits (missing or broken beat map)
    pub fn silent(settings: &BeatSettings) -> Self {
        Self::new(BeatMap::default(), settings)
    }

    /// Parse a beat map, falling back to a silent source with a warning
    pub fn from_json_or_silent(json: &str, settings: &BeatSettings) -> Self {
        Self::from_result(BeatMap::from_json(json), settings)
    }

    /// Load a beat map file, falling back to a silent source with a warning
    pub fn load_or_silent(path: impl AsRef<Path>, settings: &BeatSettings) -> Self {
        let path = path.as_ref();
        let source = Self::from_result(BeatMap::load(path), settings);
        if !source.map.beats.is_empty() {
            log::info!("Beat map source: {}", path.display());
        }
        source
    }

    fn from_result(result: Result<BeatMap, BeatMapError>, settings: &BeatSettings) -> Self {
        match result {
            Ok(map) => {
                log::info!(
                    "Loaded beat map: {} beats at {} bpm",
                    map.beats.len(),
                    map.bpm
                );
                Self::new(map, settings)
            }
            Err(err) => {
                log::warn!("Beat map unavailable, no waves will spawn: {}", err);
                Self::silent(settings)
            }
        }
    }

    pub fn map(&self) -> &BeatMap {
        &self.map
    }

    /// Index of the next unread entry
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl BeatSource for ScriptedBeatSource {
    fn poll(&mut self, frame: &BeatFrame<'_>) -> Option<BeatEvent> {
        if self.map.beats.is_empty() || !self.gate.is_open(frame) {
            return None;
        }

        let now = frame.song_time;
        let mut enough_time = self.gate.ready(now);
        let mut emitted = None;

        // Walk every entry that has already passed, spawning at most once
        while let Some(entry) = self.map.beats.get(self.cursor).copied() {
            if entry.time > now {
                break;
            }

            let beats_since_last = self
                .last_spawn_index
                .map_or(usize::MAX, |last| self.cursor - last);

            if entry.energy >= self.min_energy_to_spawn
                && beats_since_last >= self.min_beats_between_spawns
                && enough_time
            {
                let event = BeatEvent {
                    time: now,
                    energy: entry.energy.clamp(0.0, 1.0),
                };
                log::debug!("Beat #{} accepted at {:.3}s (energy {:.2})", self.cursor, now, entry.energy);
                self.last_spawn_index = Some(self.cursor);
                self.gate.mark(now);
                enough_time = false;
                emitted = Some(event);
            }

            self.cursor += 1;
        }

        emitted
    }
}

/// Live detector over spectral energy with a hysteresis latch
#[derive(Debug, Clone)]
pub struct AdaptiveBeatSource {
    band_weights: Vec<BandWeight>,
    history: Vec<f32>,
    history_idx: usize,
    filled: usize,
    latched: bool,
    beat_multiplier: f32,
    beat_release_multiplier: f32,
    min_beat_energy: f32,
    min_beat_delta: f32,
    gate: SpawnGate,
}

impl AdaptiveBeatSource {
    pub fn new(settings: &BeatSettings) -> Self {
        Self {
            band_weights: settings.band_weights.clone(),
            history: vec![0.0; settings.history_len.max(1)],
            history_idx: 0,
            filled: 0,
            latched: false,
            beat_multiplier: settings.beat_multiplier,
            beat_release_multiplier: settings.beat_release_multiplier,
            min_beat_energy: settings.min_beat_energy,
            min_beat_delta: settings.min_beat_delta,
            gate: SpawnGate::new(settings),
        }
    }

    /// Weighted bass-emphasis sum; bins beyond the spectrum count as silent
    pub fn frame_energy(&self, spectrum: &[f32]) -> f32 {
        self.band_weights
            .iter()
            .map(|band| band.weight * spectrum.get(band.bin).copied().unwrap_or(0.0))
            .sum()
    }

    /// Mean of the filled part of the history
    pub fn average(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        self.history[..self.filled].iter().sum::<f32>() / self.filled as f32
    }

    pub fn is_warm(&self) -> bool {
        self.filled == self.history.len()
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    fn push_history(&mut self, energy: f32) {
        let len = self.history.len();
        self.history[self.history_idx] = energy;
        self.history_idx = (self.history_idx + 1) % len;
        self.filled = (self.filled + 1).min(len);
    }
}

impl BeatSource for AdaptiveBeatSource {
    fn poll(&mut self, frame: &BeatFrame<'_>) -> Option<BeatEvent> {
        let spectrum = frame.spectrum?;
        if !frame.is_playing {
            return None;
        }

        let energy = self.frame_energy(spectrum);

        // Fill phase: no detection until a full window has been seen
        if !self.is_warm() || !self.gate.is_open(frame) {
            self.push_history(energy);
            return None;
        }

        let now = frame.song_time;
        let avg = self.average();
        let mut emitted = None;

        if self.latched {
            if energy < avg * self.beat_release_multiplier {
                self.latched = false;
            }
        } else {
            let raw_beat = energy > avg * self.beat_multiplier
                && energy > self.min_beat_energy
                && energy - avg > self.min_beat_delta;

            if raw_beat && self.gate.ready(now) {
                let strength = ((energy - avg) / energy).clamp(0.0, 1.0);
                log::debug!("Live beat at {:.3}s (energy {:.3}, avg {:.3})", now, energy, avg);
                self.latched = true;
                self.gate.mark(now);
                emitted = Some(BeatEvent {
                    time: now,
                    energy: strength,
                });
            }
        }

        self.push_history(energy);
        emitted
    }
}

/// Metronome fallback: one beat per period at constant energy
#[derive(Debug, Clone)]
pub struct FixedTempoBeatSource {
    period: f32,
    offset: f32,
    energy: f32,
    next_beat: u64,
    gate: SpawnGate,
}

impl FixedTempoBeatSource {
    pub fn new(
        bpm: f32,
        offset: f32,
        energy: f32,
        settings: &BeatSettings,
    ) -> Result<Self, BeatMapError> {
        if !(bpm > 0.0) || !bpm.is_finite() {
            return Err(BeatMapError::Tempo(bpm));
        }
        Ok(Self {
            period: 60.0 / bpm,
            offset,
            energy: energy.clamp(0.0, 1.0),
            next_beat: 0,
            gate: SpawnGate::new(settings),
        })
    }

    fn beat_time(&self, index: u64) -> f32 {
        self.offset + index as f32 * self.period
    }
}

impl BeatSource for FixedTempoBeatSource {
    fn poll(&mut self, frame: &BeatFrame<'_>) -> Option<BeatEvent> {
        if !self.gate.is_open(frame) {
            return None;
        }

        let now = frame.song_time;
        let mut enough_time = self.gate.ready(now);
        let mut emitted = None;

        while self.beat_time(self.next_beat) <= now {
            if enough_time {
                self.gate.mark(now);
                enough_time = false;
                emitted = Some(BeatEvent {
                    time: now,
                    energy: self.energy,
                });
            }
            self.next_beat += 1;
        }

        emitted
    }
}
