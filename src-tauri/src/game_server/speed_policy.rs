//! Speed policies - How a racer picks its target speed each frame
//!
//! Each racer owns one boxed policy, built from the configured `PolicyKind`.
//! Policies keep their own per-instance randomness and draw from the racer's
//! seeded RNG, so identical seeds replay identical races.

use std::f32::consts::TAU;
use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::Rng;

use crate::game_server::config::PolicyKind;

/// Inputs available to a policy for one frame
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub progress: f32,
    pub base_speed: f32,
    /// Racer-local clock (seconds since the racer started moving)
    pub elapsed: f32,
    pub dt: f32,
    pub scroll_speed: f32,
    /// Progress of the other racers
    pub peers: &'a [f32],
}

impl PolicyContext<'_> {
    pub fn peer_average(&self) -> Option<f32> {
        if self.peers.is_empty() {
            None
        } else {
            Some(self.peers.iter().sum::<f32>() / self.peers.len() as f32)
        }
    }
}

pub trait SpeedPolicy: Debug + Send {
    fn name(&self) -> &'static str;

    /// Desired speed for this frame
    fn target_speed(&mut self, ctx: &PolicyContext<'_>, rng: &mut StdRng) -> f32;

    /// Re-randomize per-instance state
    fn reroll(&mut self, _rng: &mut StdRng) {}
}

impl PolicyKind {
    pub fn build(&self) -> Box<dyn SpeedPolicy> {
        match *self {
            PolicyKind::Steady {
                jitter,
                change_interval,
            } => Box::new(Steady::new(jitter, change_interval)),
            PolicyKind::Oscillating {
                amplitude,
                min_frequency,
                max_frequency,
            } => Box::new(Oscillating::new(amplitude, min_frequency, max_frequency)),
            PolicyKind::RubberBand { gain, max_adjust } => {
                Box::new(RubberBand { gain, max_adjust })
            }
            PolicyKind::Zone {
                zone_width,
                catch_up_factor,
                lead_factor,
            } => Box::new(Zone {
                zone_width,
                catch_up_factor,
                lead_factor,
            }),
        }
    }
}

/// Base speed plus a random walk
#[derive(Debug, Clone)]
pub struct Steady {
    jitter: f32,
    change_interval: f32,
    offset: f32,
    until_change: f32,
}

impl Steady {
    pub fn new(jitter: f32, change_interval: f32) -> Self {
        Self {
            jitter,
            change_interval,
            offset: 0.0,
            until_change: change_interval,
        }
    }
}

impl SpeedPolicy for Steady {
    fn name(&self) -> &'static str {
        "steady"
    }

    fn target_speed(&mut self, ctx: &PolicyContext<'_>, rng: &mut StdRng) -> f32 {
        self.until_change -= ctx.dt;
        if self.until_change <= 0.0 {
            self.until_change = self.change_interval;
            if self.jitter > 0.0 {
                self.offset = rng.gen_range(-self.jitter..=self.jitter);
            }
        }
        ctx.base_speed + self.offset
    }

    fn reroll(&mut self, _rng: &mut StdRng) {
        self.offset = 0.0;
        self.until_change = self.change_interval;
    }
}

/// Periodic surge around the base speed
#[derive(Debug, Clone)]
pub struct Oscillating {
    amplitude: f32,
    min_frequency: f32,
    max_frequency: f32,
    frequency: f32,
    phase: f32,
}

impl Oscillating {
    pub fn new(amplitude: f32, min_frequency: f32, max_frequency: f32) -> Self {
        Self {
            amplitude,
            min_frequency,
            max_frequency,
            frequency: min_frequency,
            phase: 0.0,
        }
    }
}

impl SpeedPolicy for Oscillating {
    fn name(&self) -> &'static str {
        "oscillating"
    }

    fn target_speed(&mut self, ctx: &PolicyContext<'_>, _rng: &mut StdRng) -> f32 {
        let wave = (TAU * self.frequency * ctx.elapsed + self.phase).sin();
        ctx.base_speed + self.amplitude * wave
    }

    fn reroll(&mut self, rng: &mut StdRng) {
        self.frequency = rng.gen_range(self.min_frequency..=self.max_frequency);
        self.phase = rng.gen_range(0.0..TAU);
    }
}

/// Pulled toward the pack average
#[derive(Debug, Clone)]
pub struct RubberBand {
    gain: f32,
    max_adjust: f32,
}

impl SpeedPolicy for RubberBand {
    fn name(&self) -> &'static str {
        "rubber_band"
    }

    fn target_speed(&mut self, ctx: &PolicyContext<'_>, _rng: &mut StdRng) -> f32 {
        match ctx.peer_average() {
            Some(average) => {
                let pull = self.gain * (average - ctx.progress);
                ctx.base_speed + pull.clamp(-self.max_adjust, self.max_adjust)
            }
            None => ctx.base_speed,
        }
    }
}

/// Leaders ease off and stragglers catch up outside a neutral zone
#[derive(Debug, Clone)]
pub struct Zone {
    zone_width: f32,
    catch_up_factor: f32,
    lead_factor: f32,
}

impl SpeedPolicy for Zone {
    fn name(&self) -> &'static str {
        "zone"
    }

    fn target_speed(&mut self, ctx: &PolicyContext<'_>, _rng: &mut StdRng) -> f32 {
        let Some(average) = ctx.peer_average() else {
            return ctx.base_speed;
        };

        let gap = ctx.progress - average;
        if gap > self.zone_width {
            ctx.base_speed * self.lead_factor
        } else if gap < -self.zone_width {
            ctx.base_speed * self.catch_up_factor
        } else {
            ctx.base_speed
        }
    }
}
