//! Fixed timestep simulation tick
//!
//! Intra-tick order is fixed for determinism:
//! 1. beat polling
//! 2. spawn decision
//! 3. geometry advance and expiry
//! 4. overlap signals, then one evaluator pass over the active waves
//! 5. score update (risk accrual, then outcomes)

use super::beat::BeatFrame;
use super::collision::{Evaluation, Outcome, PlayerRef};
use super::state::{GameEvent, GameState};
use super::wave::WaveId;

/// External inputs for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Playback clock (seconds since the track started)
    pub song_time: f32,
    pub is_playing: bool,
    /// Frequency magnitudes for this tick (adaptive beat sources)
    pub spectrum: Option<Vec<f32>>,
    /// Player view; `None` skips collision and risk this tick
    pub player: Option<PlayerRef>,
    /// Waves an external physics collaborator saw overlapping the player
    pub overlaps: Vec<WaveId>,
}

/// Advance the session by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    state.events.clear();
    state.time_ticks += 1;
    state.time += dt;
    let now = state.time;

    // --- Beat polling ---
    let frame = BeatFrame {
        song_time: input.song_time,
        is_playing: input.is_playing,
        spectrum: input.spectrum.as_deref(),
    };
    let beat = state.beats.poll(&frame);

    // --- Spawn ---
    let mut spawned = None;
    if let Some(beat) = beat {
        state.events.push(GameEvent::Beat(beat));
        let id = state.next_wave_id();
        let wave = state.spawner.spawn(id, state.center, &beat, now);
        let launch = wave.launch();
        state.register_wave(wave);
        state.events.push(GameEvent::WaveSpawned { id, launch });
        spawned = Some(id);
    }

    // --- Geometry ---
    // A wave starts moving on the tick after it spawns
    for wave in state.waves.iter_mut() {
        if Some(wave.id) != spawned {
            wave.advance(dt);
        }
    }
    let mut expired = Vec::new();
    state.waves.retain(|wave| {
        if wave.is_expired() {
            expired.push(wave.id);
            false
        } else {
            true
        }
    });
    for id in expired {
        log::debug!("Wave {} expired", id);
        state.events.push(GameEvent::WaveExpired { id });
    }

    // --- Overlap signals ---
    for &id in &input.overlaps {
        if let Some(wave) = state.wave_mut(id)
            && !wave.hit_flag()
        {
            wave.mark_hit();
            state.events.push(GameEvent::WaveOverlap { id });
        }
    }

    let Some(player) = input.player else {
        return;
    };

    let overlapped = state.overlap.detect(&mut state.waves, &player, now);
    for id in overlapped {
        state.events.push(GameEvent::WaveOverlap { id });
    }

    // --- Collision ---
    let any_unresolved = state.waves.iter().any(|w| !w.is_resolved());
    let mut outcomes: Vec<(WaveId, Outcome)> = Vec::new();
    for wave in state.waves.iter_mut() {
        if let Evaluation::Resolved(outcome) = state.evaluator.evaluate(wave, &player) {
            outcomes.push((wave.id, outcome));
        }
    }

    // --- Score ---
    if any_unresolved {
        let anchors = state.waves.iter().map(|w| w.anchor());
        state.score.accrue_risk(player.position, anchors, dt);
    }

    for (id, outcome) in outcomes {
        match outcome {
            Outcome::Evaded => {
                let award = state.score.on_evaded();
                state.events.push(GameEvent::WaveEvaded { id, award });
            }
            Outcome::Hit => {
                state.score.on_hit();
                state.events.push(GameEvent::WaveHit { id });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polar_to_cartesian;
    use crate::settings::Settings;
    use crate::sim::beat::{BeatEntry, BeatMap};
    use glam::Vec2;

    const DT: f32 = 0.25;

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.beat.song_start_delay = 0.0;
        s.beat.min_interval = 0.1;
        s.beat.recovery_time = 0.1;
        s
    }

    fn map(beats: &[(f32, f32)]) -> BeatMap {
        BeatMap {
            bpm: 120.0,
            beats: beats
                .iter()
                .map(|&(time, energy)| BeatEntry { time, energy })
                .collect(),
        }
    }

    fn player_at(r: f32, degrees: f32) -> Option<PlayerRef> {
        Some(PlayerRef {
            position: polar_to_cartesian(Vec2::ZERO, r, degrees),
            center: Vec2::ZERO,
        })
    }

    /// Tick `n` times at DT, song clock in lockstep with the sim clock
    fn run(state: &mut GameState, n: usize, player: Option<PlayerRef>) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..n {
            let input = TickInput {
                song_time: state.time + DT,
                is_playing: true,
                player,
                ..Default::default()
            };
            tick(state, &input, DT);
            events.extend(state.events.iter().cloned());
        }
        events
    }

    fn spawn_times(events: &[GameEvent]) -> Vec<f32> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::WaveSpawned { launch, .. } => Some(launch.spawn_time),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_scripted_map_spawns_on_strong_beats() {
        let mut state =
            GameState::with_beat_map(settings(), Vec2::ZERO, map(&[(1.0, 0.5), (1.5, 0.1), (2.0, 0.8)]))
                .unwrap();
        let events = run(&mut state, 12, None);
        assert_eq!(spawn_times(&events), vec![1.0, 2.0]);
    }

    #[test]
    fn test_player_above_pulse_evades_once() {
        let mut state = GameState::with_beat_map(settings(), Vec2::ZERO, map(&[(0.25, 0.9)])).unwrap();
        // Far outside every pulse and outside the risk radius
        let events = run(&mut state, 4, player_at(500.0, 0.0));

        let evaded: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::WaveEvaded { .. }))
            .collect();
        assert_eq!(evaded.len(), 1);
        assert_eq!(state.score().score, 10);
        assert_eq!(state.score().combo, 1);
        assert!(state.waves()[0].is_resolved());

        // Resolved waves stay registered but never score again
        let later = run(&mut state, 4, player_at(500.0, 0.0));
        assert!(!later
            .iter()
            .any(|e| matches!(e, GameEvent::WaveEvaded { .. } | GameEvent::WaveHit { .. })));
        assert_eq!(state.score().waves_evaded, 1);
    }

    #[test]
    fn test_grounded_player_is_hit() {
        let mut s = settings();
        s.collision.overlap_enabled = false;
        let mut state = GameState::with_beat_map(s, Vec2::ZERO, map(&[(0.25, 0.9)])).unwrap();
        state.score.on_evaded();
        assert_eq!(state.score().combo, 1);

        // Inside the ring: below every sample radius
        let events = run(&mut state, 4, player_at(290.0, 180.0));
        assert!(events.iter().any(|e| matches!(e, GameEvent::WaveHit { .. })));
        assert_eq!(state.score().combo, 0);
        assert_eq!(state.score().score, 10);
        assert!(state.waves()[0].hit_flag());
    }

    #[test]
    fn test_missing_player_skips_judgement() {
        let mut state = GameState::with_beat_map(settings(), Vec2::ZERO, map(&[(0.25, 0.9)])).unwrap();
        let events = run(&mut state, 6, None);
        assert!(!events
            .iter()
            .any(|e| matches!(e, GameEvent::WaveEvaded { .. } | GameEvent::WaveHit { .. })));
        assert!(!state.waves()[0].is_resolved());
        assert_eq!(state.score().risk_current, 0.0);
    }

    #[test]
    fn test_external_overlap_turns_evasion_into_hit() {
        let mut s = settings();
        s.collision.min_angle_before_scoring = 1000.0; // hold the evaluator back
        let mut state = GameState::with_beat_map(s, Vec2::ZERO, map(&[(0.25, 0.9)])).unwrap();
        run(&mut state, 1, None);
        let id = state.waves()[0].id;

        let input = TickInput {
            song_time: state.time + DT,
            is_playing: true,
            overlaps: vec![id],
            ..Default::default()
        };
        tick(&mut state, &input, DT);
        assert!(state.events.contains(&GameEvent::WaveOverlap { id }));
        assert!(state.wave(id).is_some_and(|w| w.hit_flag() && !w.is_resolved()));

        // Release the evaluator: the player is clear of the pulse, but the
        // latched overlap wins
        state.evaluator = crate::sim::collision::CollisionEvaluator::new(&Default::default());
        let events = run(&mut state, 1, player_at(500.0, 0.0));
        assert!(events.contains(&GameEvent::WaveHit { id }));
        assert_eq!(state.score().waves_evaded, 0);
    }

    #[test]
    fn test_risk_accrues_then_pays_out() {
        let mut s = settings();
        s.collision.min_angle_before_scoring = 40.0;
        s.collision.overlap_enabled = false;
        // Small, slow wave; player just outside its crest height
        s.spawn.speed = crate::settings::SpeedCurve::Lerp { min: 40.0, max: 40.0 };
        let mut state = GameState::with_beat_map(s, Vec2::ZERO, map(&[(0.25, 0.2)])).unwrap();

        // 10 deg per tick: judged on the fourth advance
        let events = run(&mut state, 3, player_at(350.0, 0.0));
        assert_eq!(spawn_times(&events).len(), 1);
        // 10/s * (1 - 350/400) * 0.25s per tick, live wave on every tick so far
        assert!((state.score().risk_current - 3.0 * 0.3125).abs() < 1e-5);

        let events = run(&mut state, 2, player_at(350.0, 0.0));
        let award = events.iter().find_map(|e| match e {
            GameEvent::WaveEvaded { award, .. } => Some(*award),
            _ => None,
        });
        let award = award.expect("wave should be evaded");
        assert_eq!(award.wave_score, 10);
        // Five ticks of risk, accrued before the outcome is applied
        assert_eq!(award.risk_score, 2);
        assert_eq!(state.score().risk_current, 0.0);
    }

    #[test]
    fn test_waves_expire_and_unregister() {
        let mut s = settings();
        s.spawn.lifetime = Some(1.0);
        let mut state = GameState::with_beat_map(s, Vec2::ZERO, map(&[(0.25, 0.9)])).unwrap();
        let events = run(&mut state, 4, None);
        assert_eq!(state.waves().len(), 1);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::WaveExpired { .. })));

        let events = run(&mut state, 2, None);
        assert!(state.waves().is_empty());
        assert!(events.iter().any(|e| matches!(e, GameEvent::WaveExpired { .. })));
    }

    #[test]
    fn test_paused_playback_spawns_nothing() {
        let mut state = GameState::with_beat_map(settings(), Vec2::ZERO, map(&[(0.25, 0.9)])).unwrap();
        let input = TickInput {
            song_time: 1.0,
            is_playing: false,
            ..Default::default()
        };
        tick(&mut state, &input, DT);
        assert!(state.waves().is_empty());
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_determinism() {
        let beats = map(&[(0.25, 0.2), (1.0, 0.5), (1.75, 0.9), (2.5, 0.4), (3.0, 1.0)]);
        let mut state1 = GameState::with_beat_map(settings(), Vec2::ZERO, beats.clone()).unwrap();
        let mut state2 = GameState::with_beat_map(settings(), Vec2::ZERO, beats).unwrap();

        let mut log1 = Vec::new();
        let mut log2 = Vec::new();
        for i in 0..40 {
            let player = player_at(300.0 + (i % 7) as f32 * 20.0, (i * 13) as f32);
            log1.extend(run(&mut state1, 1, player));
            log2.extend(run(&mut state2, 1, player));
        }

        assert_eq!(log1, log2);
        assert_eq!(state1.summary(), state2.summary());
        assert_eq!(state1.time_ticks, state2.time_ticks);
    }

    #[test]
    fn test_spawn_event_matches_registered_wave() {
        let mut state = GameState::with_beat_map(settings(), Vec2::ZERO, map(&[(0.25, 0.5)])).unwrap();
        let events = run(&mut state, 1, None);
        let (id, launch) = events
            .iter()
            .find_map(|e| match e {
                GameEvent::WaveSpawned { id, launch } => Some((*id, *launch)),
                _ => None,
            })
            .expect("beat should spawn a wave");
        assert_eq!(state.wave(id).map(|w| w.launch()), Some(launch));
    }

    /// Crest-aligned judgement with a body skimming just above the crest tip
    fn skimming_state(overlap_enabled: bool) -> GameState {
        let mut s = settings();
        s.collision.require_crest_alignment = true;
        s.collision.overlap_enabled = overlap_enabled;
        // Large wave: amplitude 80, 25 deg per tick from 55 deg
        GameState::with_beat_map(s, Vec2::ZERO, map(&[(0.25, 0.9)])).unwrap()
    }

    #[test]
    fn test_body_overlap_turns_same_tick_evasion_into_hit() {
        // Crest reaches 105 deg on the third tick; tip radius ~380
        let player = player_at(385.0, 105.0);

        let mut state = skimming_state(true);
        let events = run(&mut state, 2, player);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::WaveOverlap { .. })));
        assert!(!state.waves()[0].is_resolved());

        let events = run(&mut state, 1, player);
        let id = state.waves()[0].id;
        assert!(events.contains(&GameEvent::WaveOverlap { id }));
        assert!(events.contains(&GameEvent::WaveHit { id }));
        assert_eq!(state.score().waves_evaded, 0);
        assert_eq!(state.score().combo, 0);

        // Same body without the overlap channel clears the pulse radially
        let mut state = skimming_state(false);
        let events = run(&mut state, 3, player);
        assert!(events.iter().any(|e| matches!(e, GameEvent::WaveEvaded { .. })));
        assert_eq!(state.score().waves_evaded, 1);
    }
}
