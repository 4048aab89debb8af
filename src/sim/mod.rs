//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Playback clock and spectrum come in through `TickInput`
//! - Stable iteration order (by wave ID)
//! - No rendering, audio or platform dependencies

pub mod beat;
pub mod collision;
pub mod score;
pub mod sdf;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod wave;

pub use beat::{
    AdaptiveBeatSource, BeatEvent, BeatFrame, BeatMap, BeatMapError, BeatSource,
    FixedTempoBeatSource, ScriptedBeatSource, SpawnGate,
};
pub use collision::{CollisionEvaluator, Evaluation, OverlapDetector, Outcome, PlayerRef};
pub use score::{EvadeAward, ScoreEngine, ScoreState};
pub use spawner::{AmplitudeTier, WaveSpawner};
pub use state::{GameEvent, GameState, RunSummary};
pub use tick::{TickInput, tick};
pub use wave::{WaveId, WaveLaunch, WaveState};
