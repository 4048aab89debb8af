//! Ripple Dodge headless runner
//!
//! Plays one song through the simulation with an autopilot in place of the
//! player and logs the result.
//!
//! Usage: `ripple-dodge [settings.json] [beatmap.json]`
//!
//! Without a beat map the adaptive detector listens to a synthetic,
//! seeded kick-drum spectrum.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use ripple_dodge::consts::{MAX_SUBSTEPS, SIM_DT};
use ripple_dodge::settings::Settings;
use ripple_dodge::sim::{
    AdaptiveBeatSource, BeatSource, GameEvent, GameState, PlayerRef, ScriptedBeatSource,
    TickInput, tick,
};
use ripple_dodge::{delta_angle, polar_to_cartesian};

/// Song length for a headless run (seconds)
const SONG_LENGTH: f32 = 60.0;
/// Simulated render frame
const FRAME_DT: f32 = 1.0 / 30.0;
const SPECTRUM_SEED: u64 = 0x5eed;
const SPECTRUM_BINS: usize = 64;
const KICK_BPM: f32 = 124.0;

/// Player angle on the ring (degrees)
const PLAYER_ANGLE: f32 = 270.0;
const JUMP_SPEED: f32 = 520.0;
const GRAVITY: f32 = 1600.0;
/// Seconds of warning the autopilot wants before a crest arrives
const JUMP_LEAD: f32 = 0.3;
/// Gap between the body and the ring at rest
const GROUND_CLEARANCE: f32 = 2.0;

/// Fake analyzer output: noise floor plus a decaying kick on the low bins
struct SyntheticSpectrum {
    rng: Pcg32,
    period: f32,
    next_kick: f32,
    last_kick: f32,
    kick_strength: f32,
    bins: Vec<f32>,
}

impl SyntheticSpectrum {
    fn new(seed: u64, bpm: f32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            period: 60.0 / bpm,
            next_kick: 0.0,
            last_kick: f32::NEG_INFINITY,
            kick_strength: 0.0,
            bins: vec![0.0; SPECTRUM_BINS],
        }
    }

    fn frame(&mut self, song_time: f32) -> Vec<f32> {
        while song_time >= self.next_kick {
            self.last_kick = self.next_kick;
            self.next_kick += self.period;
            // Some kicks drop out entirely
            self.kick_strength = if self.rng.random::<f32>() < 0.15 {
                0.0
            } else {
                self.rng.random_range(0.2..1.0)
            };
        }

        let envelope = self.kick_strength * (-(song_time - self.last_kick) * 14.0).exp();
        for (bin, value) in self.bins.iter_mut().enumerate() {
            let noise = self.rng.random_range(0.0..0.03);
            let kick = if (1..=6).contains(&bin) {
                envelope / bin as f32
            } else {
                0.0
            };
            *value = noise + kick;
        }
        self.bins.clone()
    }
}

/// Stands in for the movement collaborator: a body that hops off the ring
struct Autopilot {
    rest_radius: f32,
    height: f32,
    velocity: f32,
    jumps: u32,
}

impl Autopilot {
    fn new(settings: &Settings) -> Self {
        Self {
            rest_radius: settings.wave.base_radius
                + settings.collision.player_radius
                + GROUND_CLEARANCE,
            height: 0.0,
            velocity: 0.0,
            jumps: 0,
        }
    }

    fn grounded(&self) -> bool {
        self.height <= 0.0 && self.velocity <= 0.0
    }

    /// Jump when a crest that could reach the body is about to pass
    fn update(&mut self, state: &GameState, dt: f32) {
        let body_floor = self.rest_radius - state.settings.collision.player_radius;
        let threat = state.waves().iter().any(|wave| {
            let ahead = delta_angle(wave.crest_angle(), PLAYER_ANGLE);
            let reach = wave.angular_speed.abs() * JUMP_LEAD;
            wave.base_radius + wave.amplitude > body_floor && ahead > 0.0 && ahead <= reach
        });

        if threat && self.grounded() {
            self.velocity = JUMP_SPEED;
            self.jumps += 1;
        }

        self.velocity -= GRAVITY * dt;
        self.height += self.velocity * dt;
        if self.height <= 0.0 {
            self.height = 0.0;
            self.velocity = 0.0;
        }
    }

    fn player(&self, center: Vec2) -> PlayerRef {
        PlayerRef {
            position: polar_to_cartesian(center, self.rest_radius + self.height, PLAYER_ANGLE),
            center,
        }
    }
}

/// Headless session: fixed-step accumulator over simulated frames
struct Runner {
    state: GameState,
    spectrum: Option<SyntheticSpectrum>,
    autopilot: Autopilot,
    accumulator: f32,
    song_time: f32,
    overlaps: u32,
}

impl Runner {
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.song_time += SIM_DT;
            self.autopilot.update(&self.state, SIM_DT);

            let input = TickInput {
                song_time: self.song_time,
                is_playing: self.song_time < SONG_LENGTH,
                spectrum: self.spectrum.as_mut().map(|s| s.frame(self.song_time)),
                player: Some(self.autopilot.player(self.state.center)),
                overlaps: Vec::new(),
            };
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            for event in &self.state.events {
                match event {
                    GameEvent::WaveOverlap { id } => {
                        self.overlaps += 1;
                        log::debug!("Overlap with wave {}", id);
                    }
                    GameEvent::WaveSpawned { id, launch } => {
                        log::debug!("Wave {} launched at {:.2}s", id, launch.spawn_time);
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Settings file if given, otherwise the crest-aligned profile
fn load_settings(path: Option<&str>) -> Settings {
    let Some(path) = path else {
        return Settings::crest_aligned();
    };
    match Settings::load(path) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("Using crest-aligned defaults ({}): {}", path, err);
            Settings::crest_aligned()
        }
    }
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let settings = load_settings(args.first().map(String::as_str));

    let mut spectrum = None;
    let beats: Box<dyn BeatSource> = match args.get(1) {
        Some(path) => Box::new(ScriptedBeatSource::load_or_silent(path, &settings.beat)),
        None => {
            log::info!("No beat map given, listening to a synthetic {} bpm kick", KICK_BPM);
            spectrum = Some(SyntheticSpectrum::new(SPECTRUM_SEED, KICK_BPM));
            Box::new(AdaptiveBeatSource::new(&settings.beat))
        }
    };

    let autopilot = Autopilot::new(&settings);
    let state = match GameState::new(settings, Vec2::ZERO, beats) {
        Ok(state) => state,
        Err(err) => {
            log::error!("Invalid settings: {}", err);
            std::process::exit(1);
        }
    };

    log::info!("Ripple Dodge starting ({:.0}s song)", SONG_LENGTH);
    let mut runner = Runner {
        state,
        spectrum,
        autopilot,
        accumulator: 0.0,
        song_time: 0.0,
        overlaps: 0,
    };

    // Let the last waves sweep their span after the music stops
    let tail = 5.0;
    while runner.song_time < SONG_LENGTH + tail {
        runner.update(FRAME_DT);
    }

    let summary = runner.state.summary();
    log::info!(
        "Run complete: score {}, max combo {}, waves evaded {}, jumps {}, overlaps {}",
        summary.score,
        summary.max_combo,
        summary.waves_evaded,
        runner.autopilot.jumps,
        runner.overlaps
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_default()
    );
}
