//! Racer - Individual racer state and behavior
//!
//! A racer has exactly one degree of freedom: its progress along the track
//! diagonal. Screen `y` follows from progress and heading, and `x` follows
//! from `y` through the shared diagonal axis.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game_server::config::{DiagonalAxis, Heading, RacerConfig, RacerMotion, StartPosition};
use crate::game_server::speed_policy::{PolicyContext, SpeedPolicy};

/// Fraction of the remaining gap to the target speed closed after `dt` seconds
pub fn smoothing_blend(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// What counts as crossing the finish
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FinishThreshold {
    /// The live screen Y of the finish tile
    LineY(f32),
    /// A fixed progress distance, independent of the track
    Distance(f32),
}

/// A racer on the diagonal
#[derive(Debug)]
pub struct Racer {
    pub id: u32,
    pub name: String,
    pub asset: String,
    pub lane: usize,
    heading: Heading,
    start: StartPosition,
    motion: RacerMotion,
    x: f32,
    y: f32,
    progress: f32,
    base_speed: f32,
    target_speed: f32,
    current_speed: f32,
    elapsed: f32,
    finished: bool,
    finish_time: Option<f32>,
    seed: u64,
    rng: StdRng,
    policy: Box<dyn SpeedPolicy>,
}

impl Racer {
    /// Create a racer at its start anchor
    pub fn new(
        id: u32,
        identity: &RacerConfig,
        start: StartPosition,
        motion: RacerMotion,
        seed: u64,
    ) -> Self {
        let policy = motion.speed.policy.build();
        let mut racer = Self {
            id,
            name: identity.name.clone(),
            asset: identity.asset.clone(),
            lane: identity.lane,
            heading: identity.heading,
            start,
            motion,
            x: start.x,
            y: start.y,
            progress: 0.0,
            base_speed: 0.0,
            target_speed: 0.0,
            current_speed: 0.0,
            elapsed: 0.0,
            finished: false,
            finish_time: None,
            seed,
            rng: StdRng::seed_from_u64(seed),
            policy,
        };
        racer.reseed(seed);
        racer
    }

    /// Advance one frame. Returns true on the frame the racer finishes.
    pub fn advance(
        &mut self,
        scroll_speed: f32,
        dt: f32,
        peers: &[f32],
        finish: FinishThreshold,
        race_time: f32,
    ) -> bool {
        if self.finished || !dt.is_finite() || dt <= 0.0 {
            return false;
        }

        self.elapsed += dt;
        let ctx = PolicyContext {
            progress: self.progress,
            base_speed: self.base_speed,
            elapsed: self.elapsed,
            dt,
            scroll_speed,
            peers,
        };
        let target = self.policy.target_speed(&ctx, &mut self.rng);
        self.target_speed = if target.is_finite() {
            target.clamp(0.0, self.motion.speed.max_speed)
        } else {
            self.base_speed
        };

        let blend = smoothing_blend(self.motion.speed.smoothing_rate, dt);
        self.current_speed += (self.target_speed - self.current_speed) * blend;
        self.current_speed = self.current_speed.max(0.0);

        self.progress = (self.progress + self.current_speed * dt).min(self.max_progress());
        self.place();

        if self.has_crossed(finish) {
            self.finished = true;
            self.finish_time = Some(race_time);
            log::info!("{} crossed the finish at {:.2}s", self.name, race_time);
            return true;
        }
        false
    }

    /// Back to the start anchor with a freshly rolled seed
    pub fn reset(&mut self) {
        let next = self.rng.gen::<u64>();
        self.reseed(next);
    }

    /// Move onto a retuned diagonal, keeping progress
    pub fn set_axis(&mut self, axis: DiagonalAxis) {
        self.motion.axis = axis;
        self.place();
    }

    fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);

        let speed = &self.motion.speed;
        self.base_speed = self
            .rng
            .gen_range(speed.base_speed_min..=speed.base_speed_max);
        self.policy.reroll(&mut self.rng);
        self.target_speed = self.base_speed;
        self.current_speed = self.base_speed;

        self.progress = 0.0;
        self.elapsed = 0.0;
        self.finished = false;
        self.finish_time = None;
        self.place();
    }

    fn place(&mut self) {
        self.y = self.start.y + self.heading.sign() * self.progress;
        self.x = self.motion.axis.x_at(self.start.x, self.start.y, self.y);
    }

    /// Progress at which `y` reaches the edge of the safety band
    fn max_progress(&self) -> f32 {
        let room = match self.heading {
            Heading::Down => self.motion.band.max_y - self.start.y,
            Heading::Up => self.start.y - self.motion.band.min_y,
        };
        room.max(0.0)
    }

    fn has_crossed(&self, finish: FinishThreshold) -> bool {
        match finish {
            FinishThreshold::LineY(line) => match self.heading {
                Heading::Down => self.y >= line,
                Heading::Up => self.y <= line,
            },
            FinishThreshold::Distance(distance) => self.progress >= distance,
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn start(&self) -> StartPosition {
        self.start
    }

    pub fn axis(&self) -> DiagonalAxis {
        self.motion.axis
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn target_speed(&self) -> f32 {
        self.target_speed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn finish_time(&self) -> Option<f32> {
        self.finish_time
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }
}

/// Compact racer state for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacerSnapshot {
    pub id: u32,
    pub name: String,
    pub asset: String,
    pub lane: usize,
    pub x: f32,
    pub y: f32,
    pub progress: f32,
    pub speed: f32,
    pub finished: bool,
}

impl From<&Racer> for RacerSnapshot {
    fn from(racer: &Racer) -> Self {
        Self {
            id: racer.id,
            name: racer.name.clone(),
            asset: racer.asset.clone(),
            lane: racer.lane,
            x: racer.x,
            y: racer.y,
            progress: racer.progress,
            speed: racer.current_speed,
            finished: racer.finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::config::{PolicyKind, SafetyBand, SpeedConfig};
    use proptest::prelude::*;

    const FAR: FinishThreshold = FinishThreshold::Distance(f32::MAX);

    fn motion(policy: PolicyKind, min: f32, max: f32) -> RacerMotion {
        RacerMotion {
            axis: DiagonalAxis::default(),
            speed: SpeedConfig {
                policy,
                base_speed_min: min,
                base_speed_max: max,
                ..Default::default()
            },
            band: SafetyBand::default(),
        }
    }

    fn constant(speed: f32) -> RacerMotion {
        motion(
            PolicyKind::Steady {
                jitter: 0.0,
                change_interval: 1.0,
            },
            speed,
            speed,
        )
    }

    fn racer(motion: RacerMotion, seed: u64) -> Racer {
        Racer::new(
            0,
            &RacerConfig::new("Jesse", 0),
            StartPosition::new(-90.0, -30.0),
            motion,
            seed,
        )
    }

    fn assert_on_diagonal(r: &Racer) {
        let start = r.start();
        let expected = (r.y() - start.y) * r.axis().slope();
        let actual = r.x() - start.x;
        assert!(
            (actual - expected).abs() <= 1e-3 * (1.0 + expected.abs()),
            "off diagonal: dx={actual} expected={expected}"
        );
    }

    #[test]
    fn smoothing_is_frame_rate_independent() {
        let rate = 3.0;
        let one_step = smoothing_blend(rate, 0.032);
        let half = smoothing_blend(rate, 0.016);
        let two_steps = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((one_step - two_steps).abs() < 1e-6);
        assert_eq!(smoothing_blend(rate, 0.0), 0.0);
    }

    #[test]
    fn constant_speed_covers_expected_distance() {
        let mut identity = RacerConfig::new("Jesse", 0);
        identity.heading = Heading::Up;
        let mut r = Racer::new(
            0,
            &identity,
            StartPosition::new(0.0, 1000.0),
            constant(100.0),
            42,
        );

        for tick in 0..625 {
            r.advance(400.0, 0.016, &[], FAR, tick as f32 * 0.016);
        }

        assert!(r.y().abs() < 0.5, "y = {}", r.y());
        assert!(!r.is_finished());
        assert_on_diagonal(&r);
    }

    #[test]
    fn stays_on_diagonal_while_moving() {
        let mut r = racer(motion(PolicyKind::default(), 30.0, 70.0), 9);
        for _ in 0..300 {
            r.advance(400.0, 0.016, &[10.0, 20.0], FAR, 0.0);
            assert_on_diagonal(&r);
        }
        assert!(r.progress() > 0.0);
    }

    #[test]
    fn finishes_once_when_line_is_reached() {
        let mut r = racer(constant(100.0), 1);
        // Start y is -30, line at 0: 30 units at 100 u/s
        let line = FinishThreshold::LineY(0.0);

        let mut finished_on = None;
        for tick in 0..100 {
            if r.advance(400.0, 0.016, &[], line, tick as f32) {
                assert!(finished_on.is_none());
                finished_on = Some(tick);
            }
        }

        assert_eq!(finished_on, Some(18));
        assert_eq!(r.finish_time(), Some(18.0));
        assert!(r.is_finished());
    }

    #[test]
    fn finished_racer_is_frozen() {
        let mut r = racer(constant(100.0), 1);
        assert!(r.advance(400.0, 0.5, &[], FinishThreshold::Distance(10.0), 1.0));

        let (x, y, progress) = (r.x(), r.y(), r.progress());
        for _ in 0..10 {
            assert!(!r.advance(400.0, 0.5, &[], FinishThreshold::Distance(10.0), 2.0));
        }
        assert_eq!((r.x(), r.y(), r.progress()), (x, y, progress));
        assert_eq!(r.finish_time(), Some(1.0));
    }

    #[test]
    fn clamped_to_safety_band() {
        let mut r = racer(constant(250.0), 3);
        for _ in 0..1000 {
            r.advance(400.0, 0.1, &[], FAR, 0.0);
        }
        assert_eq!(r.y(), 2000.0);
        assert_on_diagonal(&r);
    }

    #[test]
    fn zero_and_bad_deltas_do_nothing() {
        let mut r = racer(constant(100.0), 3);
        assert!(!r.advance(400.0, 0.0, &[], FAR, 0.0));
        assert!(!r.advance(400.0, -1.0, &[], FAR, 0.0));
        assert!(!r.advance(400.0, f32::NAN, &[], FAR, 0.0));
        assert_eq!(r.progress(), 0.0);
    }

    #[test]
    fn reset_restores_start_and_rerolls_seed() {
        let mut r = racer(motion(PolicyKind::default(), 30.0, 70.0), 11);
        let seed = r.seed();
        for _ in 0..50 {
            r.advance(400.0, 0.016, &[], FinishThreshold::Distance(5.0), 0.0);
        }
        assert!(r.is_finished());

        r.reset();
        assert_ne!(r.seed(), seed);
        assert!(!r.is_finished());
        assert_eq!(r.finish_time(), None);
        assert_eq!((r.x(), r.y(), r.progress()), (-90.0, -30.0, 0.0));
        assert!((30.0..=70.0).contains(&r.base_speed()));
    }

    #[test]
    fn reset_twice_matches_reset_once() {
        let mut r = racer(constant(80.0), 5);
        for _ in 0..30 {
            r.advance(400.0, 0.016, &[], FAR, 0.0);
        }
        r.reset();
        let once = (r.x(), r.y(), r.progress(), r.is_finished(), r.finish_time());
        r.reset();
        let twice = (r.x(), r.y(), r.progress(), r.is_finished(), r.finish_time());
        assert_eq!(once, twice);
    }

    #[test]
    fn same_seed_same_race() {
        let policy = PolicyKind::Steady {
            jitter: 25.0,
            change_interval: 0.2,
        };
        let mut a = racer(motion(policy.clone(), 30.0, 70.0), 77);
        let mut b = racer(motion(policy, 30.0, 70.0), 77);
        let line = FinishThreshold::LineY(600.0);

        let mut finish_a = None;
        let mut finish_b = None;
        for tick in 0..5000 {
            let dt = 0.010 + (tick % 7) as f32 * 0.002;
            if a.advance(400.0, dt, &[], line, 0.0) {
                finish_a = Some(tick);
            }
            if b.advance(400.0, dt, &[], line, 0.0) {
                finish_b = Some(tick);
            }
        }

        assert!(finish_a.is_some());
        assert_eq!(finish_a, finish_b);
    }

    #[test]
    fn set_axis_replaces_drift() {
        let mut r = racer(constant(100.0), 2);
        for _ in 0..10 {
            r.advance(400.0, 0.1, &[], FAR, 0.0);
        }
        r.set_axis(DiagonalAxis::new(1.0));
        assert!((r.x() - (-90.0 - r.progress())).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn progress_never_decreases(
            seed in any::<u64>(),
            deltas in prop::collection::vec(0.0f32..0.05, 1..200),
        ) {
            let mut r = racer(motion(PolicyKind::default(), 0.0, 100.0), seed);
            let mut last = r.progress();
            for dt in deltas {
                r.advance(400.0, dt, &[50.0], FAR, 0.0);
                prop_assert!(r.progress() >= last);
                last = r.progress();
            }
        }
    }
}
