//! Race - Race setup, frame ordering and finish detection
//!
//! Each racing frame scrolls the track first, then advances every racer
//! against the finish tile's new position, then records finishers. This keeps
//! the win condition on the same frame as the crossing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game_server::config::{RaceConfig, TrackTuning};
use crate::game_server::error::ConfigError;
use crate::game_server::racer::{FinishThreshold, Racer, RacerSnapshot};
use crate::game_server::track::Track;
use crate::game_server::viewport::TileDraw;

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    NotStarted,
    Countdown,
    Racing,
    Finished,
}

/// One finisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub racer_id: u32,
    pub racer_name: String,
    pub finish_time: f32,
    pub position: u32,
}

/// Complete race state
#[derive(Debug)]
pub struct Race {
    /// Race configuration
    pub config: RaceConfig,
    /// Current race status
    pub status: RaceStatus,
    /// The scrolling track
    pub track: Track,
    /// Racers in lane order
    pub racers: Vec<Racer>,
    /// Elapsed race time (seconds)
    pub elapsed_time: f32,
    /// Countdown remaining (seconds)
    pub countdown: f32,
    /// Finish order, winner first
    pub finish_order: Vec<RaceResult>,
    seed: u64,
}

impl Race {
    /// Create a race with the track pre-scrolled and racers on their marks
    pub fn new(config: RaceConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut track = Track::new(config.track.clone(), config.axis)?;
        track.generate_with_pre_scroll(config.pre_scroll_distance());

        let mut race = Self {
            countdown: config.countdown_secs,
            config,
            status: RaceStatus::NotStarted,
            track,
            racers: Vec::new(),
            elapsed_time: 0.0,
            finish_order: Vec::new(),
            seed,
        };
        race.generate_racers()?;
        Ok(race)
    }

    /// Place racers from the start table, each with its own seed
    pub fn generate_racers(&mut self) -> Result<(), ConfigError> {
        let mut seeds = StdRng::seed_from_u64(self.seed);
        let motion = self.config.motion();

        self.racers.clear();
        for (i, identity) in self.config.racers.iter().enumerate() {
            let start = self
                .config
                .start_table
                .get(&identity.name)
                .ok_or_else(|| ConfigError::UnknownRacer(identity.name.clone()))?;
            let racer = Racer::new(i as u32, identity, start, motion.clone(), seeds.gen());
            log::debug!(
                "{} in lane {} ({} policy, base speed {:.1})",
                racer.name,
                racer.lane,
                racer.policy_name(),
                racer.base_speed()
            );
            self.racers.push(racer);
        }
        Ok(())
    }

    /// Start (or restart) the countdown from a freshly pre-scrolled track
    pub fn start_countdown(&mut self) {
        self.track
            .generate_with_pre_scroll(self.config.pre_scroll_distance());
        for racer in &mut self.racers {
            racer.reset();
        }
        self.elapsed_time = 0.0;
        self.finish_order.clear();
        self.countdown = self.config.countdown_secs;

        self.status = if self.countdown > 0.0 {
            RaceStatus::Countdown
        } else {
            RaceStatus::Racing
        };
    }

    /// Update race state by `delta` seconds
    pub fn update(&mut self, delta: f32) {
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }

        match self.status {
            RaceStatus::NotStarted | RaceStatus::Finished => {}

            RaceStatus::Countdown => {
                self.countdown -= delta;
                if self.countdown <= 0.0 {
                    self.status = RaceStatus::Racing;
                    self.countdown = 0.0;
                    log::info!("Countdown over, racing");
                }
            }

            RaceStatus::Racing => {
                self.elapsed_time += delta;
                self.track.update_movement(self.config.scroll_speed * delta);

                if let Some(line) = self.track.finish_line_y() {
                    self.advance_racers(delta, FinishThreshold::LineY(line));
                }

                if self.finish_order.len() == self.racers.len() {
                    self.status = RaceStatus::Finished;
                    log::info!("All racers finished at {:.2}s", self.elapsed_time);
                } else if self.track.is_exhausted() {
                    self.status = RaceStatus::Finished;
                    log::info!(
                        "Track exhausted at {:.2}s with {} finishers",
                        self.elapsed_time,
                        self.finish_order.len()
                    );
                }
            }
        }
    }

    fn advance_racers(&mut self, delta: f32, finish: FinishThreshold) {
        // Peers see progress from the start of the frame
        let progress: Vec<f32> = self.racers.iter().map(Racer::progress).collect();
        let scroll_speed = self.config.scroll_speed;
        let mut peers = Vec::with_capacity(progress.len());

        for (i, racer) in self.racers.iter_mut().enumerate() {
            peers.clear();
            peers.extend(
                progress
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, p)| *p),
            );

            if racer.advance(scroll_speed, delta, &peers, finish, self.elapsed_time) {
                let position = (self.finish_order.len() + 1) as u32;
                if position == 1 {
                    log::info!("{} wins in {:.2}s", racer.name, self.elapsed_time);
                }
                self.finish_order.push(RaceResult {
                    racer_id: racer.id,
                    racer_name: racer.name.clone(),
                    finish_time: self.elapsed_time,
                    position,
                });
            }
        }
    }

    /// Apply live track tuning and move every racer onto the new diagonal
    pub fn retune(&mut self, tuning: TrackTuning) -> Result<(), ConfigError> {
        self.track.retune(tuning)?;

        let axis = self.track.axis();
        self.config.axis = axis;
        self.config.track = self.track.config().clone();
        for racer in &mut self.racers {
            racer.set_axis(axis);
        }
        Ok(())
    }

    /// First finisher
    pub fn winner(&self) -> Option<&RaceResult> {
        self.finish_order.first()
    }

    /// Get compact snapshot for IPC transfer
    pub fn get_snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            status: self.status,
            elapsed_time: self.elapsed_time,
            countdown: self.countdown,
            scrolled_distance: self.track.scrolled_distance(),
            tiles: self.config.viewport.tile_draws(self.track.tiles()),
            racers: self.racers.iter().map(RacerSnapshot::from).collect(),
            racer_size: self.config.viewport.racer_sprite_size,
            finisher_count: self.finish_order.len() as u32,
            winner: self.winner().map(|r| r.racer_name.clone()),
        }
    }

    /// Get current leader
    pub fn get_leader(&self) -> Option<&Racer> {
        self.racers
            .iter()
            .max_by(|a, b| a.progress().total_cmp(&b.progress()))
    }

    /// Get racer by ID
    pub fn get_racer(&self, id: u32) -> Option<&Racer> {
        self.racers.iter().find(|r| r.id == id)
    }
}

/// Compact race snapshot for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub elapsed_time: f32,
    pub countdown: f32,
    pub scrolled_distance: f32,
    /// Visible tiles, back to front
    pub tiles: Vec<TileDraw>,
    pub racers: Vec<RacerSnapshot>,
    pub racer_size: f32,
    pub finisher_count: u32,
    pub winner: Option<String>,
}
