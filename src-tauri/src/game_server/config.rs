//! Config - Shared geometry and race configuration
//!
//! The diagonal axis is owned by neither the track nor the racers. Both get a
//! copy at construction, and retuning replaces it on both sides together.
//! Every struct deserializes with defaults so a partial JSON file is enough.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game_server::error::ConfigError;
use crate::game_server::viewport::Viewport;

/// Maximum racers on one track
pub const MAX_RACERS: usize = 4;

fn require_finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

fn require_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

/// Slope shared by the track ribbon and every racer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagonalAxis {
    /// Horizontal drift per unit of vertical distance
    pub offset_x_ratio: f32,
}

impl DiagonalAxis {
    pub const fn new(offset_x_ratio: f32) -> Self {
        Self { offset_x_ratio }
    }

    /// dx/dy along the ribbon. Moving down the screen drifts left.
    pub fn slope(&self) -> f32 {
        -self.offset_x_ratio
    }

    /// X of the point at `y` on the diagonal through `(anchor_x, anchor_y)`
    pub fn x_at(&self, anchor_x: f32, anchor_y: f32, y: f32) -> f32 {
        anchor_x + (y - anchor_y) * self.slope()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_finite("offset_x_ratio", self.offset_x_ratio)
    }
}

impl Default for DiagonalAxis {
    fn default() -> Self {
        Self::new(1.67)
    }
}

/// Direction a racer travels along the screen Y axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    /// Toward higher Y, the direction the track chains its tiles
    #[default]
    Down,
    Up,
}

impl Heading {
    pub fn sign(self) -> f32 {
        match self {
            Heading::Down => 1.0,
            Heading::Up => -1.0,
        }
    }
}

/// Background segment types, doubling as asset identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Env1,
    Env2,
    Start,
    Finish,
}

impl TileKind {
    pub fn asset_id(self) -> &'static str {
        match self {
            TileKind::Env1 => "env1",
            TileKind::Env2 => "env2",
            TileKind::Start => "start",
            TileKind::Finish => "finish",
        }
    }
}

/// Track geometry and tile sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub zoom_factor: f32,
    /// Unzoomed tile size (the canvas size the art was drawn for)
    pub base_width: f32,
    pub base_height: f32,
    /// Vertical distance between successive tiles
    pub chain_height: f32,
    /// Screen X the first tile is centered on
    pub center_x: f32,
    pub origin_y: f32,
    /// The race is over once the last tile's top edge scrolls above this Y
    pub exhausted_below_y: f32,
    pub sequence: Vec<TileKind>,
}

impl TrackConfig {
    pub fn tile_width(&self) -> f32 {
        self.base_width * self.zoom_factor
    }

    pub fn tile_height(&self) -> f32 {
        self.base_height * self.zoom_factor
    }

    pub fn initial_x(&self) -> f32 {
        -(self.tile_width() / 2.0) + self.center_x
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("zoom_factor", self.zoom_factor)?;
        require_positive("base_width", self.base_width)?;
        require_positive("base_height", self.base_height)?;
        require_positive("chain_height", self.chain_height)?;
        require_finite("center_x", self.center_x)?;
        require_finite("origin_y", self.origin_y)?;
        require_finite("exhausted_below_y", self.exhausted_below_y)?;

        match self.sequence.iter().filter(|k| **k == TileKind::Finish).count() {
            0 => Err(ConfigError::MissingFinishTile),
            1 => Ok(()),
            n => Err(ConfigError::DuplicateFinishTile(n)),
        }
    }
}

impl Default for TrackConfig {
    fn default() -> Self {
        use TileKind::*;
        Self {
            zoom_factor: 1.61,
            base_width: 1200.0,
            base_height: 1800.0,
            chain_height: 800.0,
            center_x: 600.0,
            origin_y: -550.0,
            exhausted_below_y: 600.0,
            sequence: vec![
                Env2, Start, Env1, Env2, Env1, Env2, Env1, Env2, Env1, Env2, Finish, Env2, Env2,
                Env2,
            ],
        }
    }
}

/// Live debug tuning of the track geometry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTuning {
    pub chain_height: Option<f32>,
    pub offset_x_ratio: Option<f32>,
    pub zoom_factor: Option<f32>,
}

/// Speed variation strategy and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyKind {
    /// Base speed with a random walk re-rolled every `change_interval` seconds
    Steady { jitter: f32, change_interval: f32 },
    /// Sinusoidal surge around the base speed
    Oscillating {
        amplitude: f32,
        min_frequency: f32,
        max_frequency: f32,
    },
    /// Pulled toward the pack's average progress
    RubberBand { gain: f32, max_adjust: f32 },
    /// Leaders slowed, stragglers boosted outside a neutral zone
    Zone {
        zone_width: f32,
        catch_up_factor: f32,
        lead_factor: f32,
    },
}

impl PolicyKind {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            PolicyKind::Steady {
                jitter,
                change_interval,
            } => {
                require_non_negative("jitter", jitter)?;
                require_positive("change_interval", change_interval)
            }
            PolicyKind::Oscillating {
                amplitude,
                min_frequency,
                max_frequency,
            } => {
                require_non_negative("amplitude", amplitude)?;
                require_non_negative("min_frequency", min_frequency)?;
                require_non_negative("max_frequency", max_frequency)?;
                if min_frequency > max_frequency {
                    return Err(ConfigError::InvalidValue {
                        field: "max_frequency",
                        value: max_frequency,
                    });
                }
                Ok(())
            }
            PolicyKind::RubberBand { gain, max_adjust } => {
                require_non_negative("gain", gain)?;
                require_non_negative("max_adjust", max_adjust)
            }
            PolicyKind::Zone {
                zone_width,
                catch_up_factor,
                lead_factor,
            } => {
                require_non_negative("zone_width", zone_width)?;
                require_non_negative("catch_up_factor", catch_up_factor)?;
                require_non_negative("lead_factor", lead_factor)
            }
        }
    }
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::Oscillating {
            amplitude: 15.0,
            min_frequency: 0.15,
            max_frequency: 0.5,
        }
    }
}

/// Racer speed model (units per second)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub policy: PolicyKind,
    pub base_speed_min: f32,
    pub base_speed_max: f32,
    pub max_speed: f32,
    /// Exponential smoothing rate toward the target speed, per second
    pub smoothing_rate: f32,
}

impl SpeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        require_non_negative("base_speed_min", self.base_speed_min)?;
        require_non_negative("base_speed_max", self.base_speed_max)?;
        if self.base_speed_min > self.base_speed_max {
            return Err(ConfigError::InvalidValue {
                field: "base_speed_max",
                value: self.base_speed_max,
            });
        }
        require_non_negative("max_speed", self.max_speed)?;
        require_positive("smoothing_rate", self.smoothing_rate)
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            base_speed_min: 30.0,
            base_speed_max: 70.0,
            max_speed: 250.0,
            // 5% per frame at 60 fps
            smoothing_rate: 3.0,
        }
    }
}

/// Screen-space anchor a racer starts from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StartPosition {
    pub x: f32,
    pub y: f32,
}

impl StartPosition {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Start anchors keyed by racer name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StartTable(pub BTreeMap<String, StartPosition>);

impl StartTable {
    pub fn get(&self, name: &str) -> Option<StartPosition> {
        self.0.get(name).copied()
    }
}

impl Default for StartTable {
    fn default() -> Self {
        let entries = [
            ("Jesse", StartPosition::new(-90.0, -30.0)),
            ("Barmstrong", StartPosition::new(190.0, 150.0)),
            ("Deployer", StartPosition::new(460.0, 300.0)),
            ("Dish", StartPosition::new(790.0, 530.0)),
        ];
        Self(
            entries
                .into_iter()
                .map(|(name, pos)| (name.to_string(), pos))
                .collect(),
        )
    }
}

/// Racer identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RacerEntry")]
pub struct RacerConfig {
    pub name: String,
    pub asset: String,
    pub lane: usize,
    #[serde(default)]
    pub heading: Heading,
}

/// Racer entry as written in a config file; `asset` defaults to the lowercased name
#[derive(Deserialize)]
struct RacerEntry {
    name: String,
    #[serde(default)]
    asset: Option<String>,
    lane: usize,
    #[serde(default)]
    heading: Heading,
}

impl From<RacerEntry> for RacerConfig {
    fn from(entry: RacerEntry) -> Self {
        Self {
            asset: entry.asset.unwrap_or_else(|| entry.name.to_lowercase()),
            name: entry.name,
            lane: entry.lane,
            heading: entry.heading,
        }
    }
}

impl RacerConfig {
    pub fn new(name: &str, lane: usize) -> Self {
        Self {
            name: name.to_string(),
            asset: name.to_lowercase(),
            lane,
            heading: Heading::Down,
        }
    }

    /// The four-racer default roster
    pub fn roster() -> Vec<RacerConfig> {
        ["Jesse", "Barmstrong", "Deployer", "Dish"]
            .iter()
            .enumerate()
            .map(|(lane, name)| RacerConfig::new(name, lane))
            .collect()
    }
}

/// Vertical band racers are kept inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyBand {
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for SafetyBand {
    fn default() -> Self {
        Self {
            min_y: -500.0,
            max_y: 2000.0,
        }
    }
}

/// Everything a racer needs to move, derived from the race config
#[derive(Debug, Clone, PartialEq)]
pub struct RacerMotion {
    pub axis: DiagonalAxis,
    pub speed: SpeedConfig,
    pub band: SafetyBand,
}

/// Complete race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub axis: DiagonalAxis,
    pub track: TrackConfig,
    pub speed: SpeedConfig,
    pub racers: Vec<RacerConfig>,
    pub start_table: StartTable,
    pub safety_band: SafetyBand,
    pub viewport: Viewport,
    /// Track scroll speed (units per second)
    pub scroll_speed: f32,
    /// Seconds of scrolling applied before the first visible frame
    pub pre_scroll_secs: f32,
    pub countdown_secs: f32,
    /// Frame deltas at or above this are treated as a stalled tab and dropped
    pub max_frame_ms: f32,
    /// Master seed; `None` draws one from entropy
    pub seed: Option<u64>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            axis: DiagonalAxis::default(),
            track: TrackConfig::default(),
            speed: SpeedConfig::default(),
            racers: RacerConfig::roster(),
            start_table: StartTable::default(),
            safety_band: SafetyBand::default(),
            viewport: Viewport::default(),
            scroll_speed: 400.0,
            pre_scroll_secs: 1.25,
            countdown_secs: 3.0,
            max_frame_ms: 1000.0,
            seed: None,
        }
    }
}

impl RaceConfig {
    /// Parse a JSON config, filling omitted fields with defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn pre_scroll_distance(&self) -> f32 {
        self.scroll_speed * self.pre_scroll_secs
    }

    pub fn motion(&self) -> RacerMotion {
        RacerMotion {
            axis: self.axis,
            speed: self.speed.clone(),
            band: self.safety_band,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.axis.validate()?;
        self.track.validate()?;
        self.speed.validate()?;
        self.viewport.validate()?;

        require_non_negative("scroll_speed", self.scroll_speed)?;
        require_non_negative("pre_scroll_secs", self.pre_scroll_secs)?;
        require_non_negative("countdown_secs", self.countdown_secs)?;
        require_positive("max_frame_ms", self.max_frame_ms)?;
        require_finite("safety_band.min_y", self.safety_band.min_y)?;
        require_finite("safety_band.max_y", self.safety_band.max_y)?;
        if self.safety_band.min_y >= self.safety_band.max_y {
            return Err(ConfigError::InvalidValue {
                field: "safety_band.max_y",
                value: self.safety_band.max_y,
            });
        }

        for start in self.start_table.0.values() {
            require_finite("start_table.x", start.x)?;
            if !(self.safety_band.min_y..=self.safety_band.max_y).contains(&start.y) {
                return Err(ConfigError::InvalidValue {
                    field: "start_table.y",
                    value: start.y,
                });
            }
        }

        if self.racers.is_empty() || self.racers.len() > MAX_RACERS {
            return Err(ConfigError::RacerCount(self.racers.len()));
        }

        let mut lanes = Vec::with_capacity(self.racers.len());
        for racer in &self.racers {
            if self.start_table.get(&racer.name).is_none() {
                return Err(ConfigError::UnknownRacer(racer.name.clone()));
            }
            if lanes.contains(&racer.lane) {
                return Err(ConfigError::DuplicateLane(racer.lane));
            }
            lanes.push(racer.lane);
            // The finish tile chains toward higher Y
            if racer.heading != Heading::Down {
                return Err(ConfigError::HeadingMismatch(racer.name.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(RaceConfig::default().validate(), Ok(()));
    }

    #[test]
    fn default_track_matches_reference_geometry() {
        let track = TrackConfig::default();
        assert_eq!(track.sequence.len(), 14);
        assert_eq!(track.sequence[10], TileKind::Finish);
        assert!((track.tile_width() - 1932.0).abs() < 1e-2);
        assert!((track.initial_x() - -366.0).abs() < 1e-2);
    }

    #[test]
    fn missing_finish_tile_is_rejected() {
        let mut config = RaceConfig::default();
        config.track.sequence.retain(|k| *k != TileKind::Finish);
        assert_eq!(config.validate(), Err(ConfigError::MissingFinishTile));
    }

    #[test]
    fn duplicate_finish_tile_is_rejected() {
        let mut config = RaceConfig::default();
        config.track.sequence.push(TileKind::Finish);
        assert_eq!(config.validate(), Err(ConfigError::DuplicateFinishTile(2)));
    }

    #[test]
    fn racer_count_is_bounded() {
        let mut config = RaceConfig::default();
        config.racers.clear();
        assert_eq!(config.validate(), Err(ConfigError::RacerCount(0)));

        config.racers = RacerConfig::roster();
        config.racers.push(RacerConfig::new("Jesse", 9));
        assert_eq!(config.validate(), Err(ConfigError::RacerCount(5)));
    }

    #[test]
    fn unknown_racer_and_shared_lane_are_rejected() {
        let mut config = RaceConfig::default();
        config.racers = vec![RacerConfig::new("Nobody", 0)];
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownRacer("Nobody".into()))
        );

        config.racers = vec![RacerConfig::new("Jesse", 1), RacerConfig::new("Dish", 1)];
        assert_eq!(config.validate(), Err(ConfigError::DuplicateLane(1)));
    }

    #[test]
    fn start_outside_safety_band_is_rejected() {
        let mut config = RaceConfig::default();
        config
            .start_table
            .0
            .insert("Jesse".into(), StartPosition::new(0.0, 2500.0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "start_table.y",
                value: 2500.0
            })
        );

        config
            .start_table
            .0
            .insert("Jesse".into(), StartPosition::new(0.0, -501.0));
        assert!(config.validate().is_err());

        config
            .start_table
            .0
            .insert("Jesse".into(), StartPosition::new(0.0, 2000.0));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn racer_asset_defaults_to_lowercased_name() {
        let config = RaceConfig::from_json(
            r#"{ "racers": [ { "name": "Jesse", "lane": 0 }, { "name": "Dish", "asset": "dish-alt", "lane": 1 } ] }"#,
        )
        .unwrap();
        assert_eq!(config.racers[0].asset, "jesse");
        assert_eq!(config.racers[0].heading, Heading::Down);
        assert_eq!(config.racers[1].asset, "dish-alt");
    }

    #[test]
    fn up_heading_racer_does_not_fit_the_track() {
        let mut config = RaceConfig::default();
        config.racers[0].heading = Heading::Up;
        assert_eq!(
            config.validate(),
            Err(ConfigError::HeadingMismatch("Jesse".into()))
        );
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut config = RaceConfig::default();
        config.track.zoom_factor = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "zoom_factor", .. })
        ));

        let mut config = RaceConfig::default();
        config.axis.offset_x_ratio = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = RaceConfig::default();
        config.speed.base_speed_min = 90.0;
        config.speed.base_speed_max = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = RaceConfig::from_json(
            r#"{
                "scroll_speed": 250.0,
                "seed": 7,
                "axis": { "offset_x_ratio": 1.5 },
                "speed": { "policy": { "kind": "rubber_band", "gain": 0.5, "max_adjust": 20.0 } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.scroll_speed, 250.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.axis.offset_x_ratio, 1.5);
        assert_eq!(
            config.speed.policy,
            PolicyKind::RubberBand { gain: 0.5, max_adjust: 20.0 }
        );
        assert_eq!(config.speed.smoothing_rate, 3.0);
        assert_eq!(config.racers.len(), 4);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            RaceConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn axis_slope_runs_against_the_ratio() {
        let axis = DiagonalAxis::new(2.0);
        assert_eq!(axis.slope(), -2.0);
        assert_eq!(axis.x_at(10.0, 0.0, 5.0), 0.0);
    }
}
