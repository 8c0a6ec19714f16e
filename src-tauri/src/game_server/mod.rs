//! Game Server Module
//!
//! Scrolling track, autonomous racers and the frame loop that drives them.
//! Communicates with the JS frontend via Tauri commands.

pub mod config;
pub mod error;
pub mod race;
pub mod racer;
pub mod simulation;
pub mod speed_policy;
pub mod track;
pub mod viewport;

pub use config::{DiagonalAxis, RaceConfig, TrackTuning};
pub use error::ConfigError;
pub use race::{Race, RaceResult, RaceSnapshot, RaceStatus};
pub use racer::{FinishThreshold, Racer};
pub use simulation::{GameServer, GameState, ServerStats};
pub use track::{Tile, Track};
