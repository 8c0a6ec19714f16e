//! Simulation - Main game server and frame loop
//!
//! Manages the session state, turns wall-clock time into frame deltas and
//! provides the interface for Tauri commands.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::game_server::config::{RaceConfig, TrackTuning};
use crate::game_server::error::ConfigError;
use crate::game_server::race::{Race, RaceResult, RaceSnapshot, RaceStatus};

/// Number of tick timings kept for the average
const TICK_HISTORY: usize = 60;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Loading,
    Ready,
    Racing,
    Results,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    /// Measured frames per second over recent accepted frames
    pub tick_rate: f32,
    pub avg_tick_time_ms: f32,
    pub racer_count: u32,
    pub dropped_frames: u32,
    pub game_state: GameState,
}

/// Whether a frame delta should be integrated
pub fn frame_is_usable(delta_ms: f32, max_frame_ms: f32) -> bool {
    delta_ms.is_finite() && delta_ms >= 0.0 && delta_ms < max_frame_ms
}

/// Main game server
pub struct GameServer {
    /// Current game state
    state: GameState,
    /// Active race (if any)
    race: Option<Race>,
    /// Recent accepted frame deltas (ms)
    frame_deltas: VecDeque<f32>,
    /// Last tick timestamp
    last_tick: Instant,
    /// Recent tick processing times (ms)
    tick_times: VecDeque<f32>,
    /// Frames rejected as stalls
    dropped_frames: u32,
    /// Whether the simulation is advancing
    running: bool,
}

impl GameServer {
    /// Create a new game server
    pub fn new() -> Self {
        Self {
            state: GameState::Idle,
            race: None,
            frame_deltas: VecDeque::with_capacity(TICK_HISTORY),
            last_tick: Instant::now(),
            tick_times: VecDeque::with_capacity(TICK_HISTORY),
            dropped_frames: 0,
            running: false,
        }
    }

    /// Initialize a new race with given config
    pub fn init_race(&mut self, config: RaceConfig) -> Result<(), ConfigError> {
        let previous = self.state;
        self.state = GameState::Loading;

        match Race::new(config) {
            Ok(race) => {
                self.race = Some(race);
                self.state = GameState::Ready;
                self.running = false;
                self.dropped_frames = 0;
                self.frame_deltas.clear();
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected race config: {}", e);
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Start (or restart) the race countdown
    pub fn start_race(&mut self) {
        if self.state == GameState::Racing {
            return;
        }
        if let Some(race) = &mut self.race {
            race.start_countdown();
            self.state = GameState::Racing;
            self.running = true;
            self.last_tick = Instant::now();
        }
    }

    /// Advance by the wall-clock time since the last tick
    pub fn tick(&mut self) -> Option<RaceSnapshot> {
        let now = Instant::now();
        let delta_ms = now.duration_since(self.last_tick).as_secs_f32() * 1000.0;
        self.last_tick = now;

        self.advance_frame(delta_ms)
    }

    /// Advance by an explicit frame delta in milliseconds
    pub fn advance_frame(&mut self, delta_ms: f32) -> Option<RaceSnapshot> {
        if !self.running {
            return self.get_snapshot();
        }

        let tick_start = Instant::now();

        if let Some(race) = &mut self.race {
            if frame_is_usable(delta_ms, race.config.max_frame_ms) {
                race.update(delta_ms / 1000.0);
                if self.frame_deltas.len() == TICK_HISTORY {
                    self.frame_deltas.pop_front();
                }
                self.frame_deltas.push_back(delta_ms);
            } else {
                self.dropped_frames += 1;
                log::debug!("Dropped frame with delta {}ms", delta_ms);
            }

            if race.status == RaceStatus::Finished {
                self.state = GameState::Results;
                self.running = false;
            }
        }

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        if self.tick_times.len() == TICK_HISTORY {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(tick_time);

        self.get_snapshot()
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(Race::get_snapshot)
    }

    /// Get race results
    pub fn get_results(&self) -> Option<Vec<RaceResult>> {
        self.race.as_ref().map(|r| r.finish_order.clone())
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        let frame_time: f32 = self.frame_deltas.iter().sum();
        let tick_rate = if frame_time > 0.0 {
            self.frame_deltas.len() as f32 * 1000.0 / frame_time
        } else {
            0.0
        };

        ServerStats {
            tick_rate,
            avg_tick_time_ms: avg_tick_time,
            racer_count: self.race.as_ref().map(|r| r.racers.len() as u32).unwrap_or(0),
            dropped_frames: self.dropped_frames,
            game_state: self.state,
        }
    }

    /// Get current game state
    pub fn get_state(&self) -> GameState {
        self.state
    }

    /// Apply live track tuning to the current race
    pub fn tune_track(&mut self, tuning: TrackTuning) -> Result<(), ConfigError> {
        match &mut self.race {
            Some(race) => race.retune(tuning),
            None => Ok(()),
        }
    }

    pub fn race(&self) -> Option<&Race> {
        self.race.as_ref()
    }

    /// Reset to idle state
    pub fn reset(&mut self) {
        self.state = GameState::Idle;
        self.race = None;
        self.running = false;
        self.dropped_frames = 0;
        self.tick_times.clear();
        self.frame_deltas.clear();
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.state == GameState::Racing {
            self.running = true;
            self.last_tick = Instant::now();
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_server(seed: u64) -> GameServer {
        let mut server = GameServer::new();
        server
            .init_race(RaceConfig {
                seed: Some(seed),
                countdown_secs: 0.0,
                ..Default::default()
            })
            .unwrap();
        server
    }

    #[test]
    fn stall_frames_are_dropped() {
        assert!(frame_is_usable(16.0, 1000.0));
        assert!(frame_is_usable(0.0, 1000.0));
        assert!(!frame_is_usable(1000.0, 1000.0));
        assert!(!frame_is_usable(-5.0, 1000.0));
        assert!(!frame_is_usable(f32::INFINITY, 1000.0));

        let mut server = ready_server(1);
        server.start_race();
        let before = server.get_snapshot().unwrap().scrolled_distance;

        let after = server.advance_frame(5000.0).unwrap();
        assert_eq!(after.scrolled_distance, before);
        assert_eq!(server.get_stats().dropped_frames, 1);
    }

    #[test]
    fn lifecycle_reaches_results() {
        let mut server = ready_server(2);
        assert_eq!(server.get_state(), GameState::Ready);
        assert!(!server.is_running());

        server.start_race();
        assert_eq!(server.get_state(), GameState::Racing);

        for _ in 0..5000 {
            server.advance_frame(16.0);
            if server.get_state() == GameState::Results {
                break;
            }
        }
        assert_eq!(server.get_state(), GameState::Results);
        assert!(!server.is_running());
        assert!(!server.get_results().unwrap().is_empty());
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut server = ready_server(3);
        server.start_race();
        server.advance_frame(16.0);

        server.pause();
        let paused = server.get_snapshot().unwrap().elapsed_time;
        server.advance_frame(16.0);
        assert_eq!(server.get_snapshot().unwrap().elapsed_time, paused);

        server.resume();
        server.advance_frame(16.0);
        assert!(server.get_snapshot().unwrap().elapsed_time > paused);
    }

    #[test]
    fn bad_config_keeps_previous_race() {
        let mut server = ready_server(4);
        let mut config = RaceConfig::default();
        config.racers.clear();

        assert!(server.init_race(config).is_err());
        assert_eq!(server.get_state(), GameState::Ready);
        assert!(server.race().is_some());

        let mut fresh = GameServer::new();
        assert!(fresh.init_race(RaceConfig {
            scroll_speed: -1.0,
            ..Default::default()
        })
        .is_err());
        assert_eq!(fresh.get_state(), GameState::Idle);
    }

    #[test]
    fn rejected_config_mid_race_keeps_racing() {
        let mut server = ready_server(6);
        server.start_race();
        server.advance_frame(16.0);
        let elapsed = server.get_snapshot().unwrap().elapsed_time;

        let mut config = RaceConfig::default();
        config.racers.clear();
        assert!(server.init_race(config).is_err());
        assert_eq!(server.get_state(), GameState::Racing);
        assert!(server.is_running());

        // Still the same race, not restarted
        server.start_race();
        server.advance_frame(16.0);
        assert!(server.get_snapshot().unwrap().elapsed_time > elapsed);
    }

    #[test]
    fn tick_rate_is_measured() {
        let mut server = ready_server(7);
        assert_eq!(server.get_stats().tick_rate, 0.0);

        server.start_race();
        for _ in 0..10 {
            server.advance_frame(20.0);
        }
        server.advance_frame(5000.0);
        assert!((server.get_stats().tick_rate - 50.0).abs() < 1e-3);
    }

    #[test]
    fn reset_goes_idle() {
        let mut server = ready_server(5);
        server.start_race();
        server.advance_frame(16.0);
        server.reset();

        assert_eq!(server.get_state(), GameState::Idle);
        assert!(server.get_snapshot().is_none());
        assert_eq!(server.get_stats().racer_count, 0);
    }

    #[test]
    fn tuning_without_race_is_a_no_op() {
        let mut server = GameServer::new();
        assert!(server
            .tune_track(TrackTuning {
                chain_height: Some(900.0),
                ..Default::default()
            })
            .is_ok());
    }
}
