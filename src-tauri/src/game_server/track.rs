//! Track - Chained background tiles and the scroll transform
//!
//! A finite tile sequence is laid out as one diagonal ribbon. Scrolling
//! moves every tile up the screen while drifting it sideways along the same
//! diagonal, so the ribbon looks like an endless road.

use serde::{Deserialize, Serialize};

use crate::game_server::config::{DiagonalAxis, TileKind, TrackConfig, TrackTuning};
use crate::game_server::error::ConfigError;

/// One background segment, positioned in screen space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Tile {
    pub fn asset_id(&self) -> &'static str {
        self.kind.asset_id()
    }
}

/// The scrolling track
#[derive(Debug, Clone)]
pub struct Track {
    config: TrackConfig,
    axis: DiagonalAxis,
    /// Sorted by ascending Y (back-to-front)
    tiles: Vec<Tile>,
    scrolled: f32,
}

impl Track {
    /// Build a track and generate its tiles
    pub fn new(config: TrackConfig, axis: DiagonalAxis) -> Result<Self, ConfigError> {
        config.validate()?;
        axis.validate()?;

        let mut track = Self {
            config,
            axis,
            tiles: Vec::new(),
            scrolled: 0.0,
        };
        track.generate();
        Ok(track)
    }

    /// Rebuild every tile from the sequence
    pub fn generate(&mut self) -> &[Tile] {
        let width = self.config.tile_width();
        let height = self.config.tile_height();
        let origin_x = self.config.initial_x();
        let origin_y = self.config.origin_y;
        let step_y = self.config.chain_height;
        let step_x = step_y * self.axis.slope();

        self.tiles = self
            .config
            .sequence
            .iter()
            .enumerate()
            .map(|(i, &kind)| Tile {
                kind,
                x: origin_x + i as f32 * step_x,
                y: origin_y + i as f32 * step_y,
                width,
                height,
            })
            .collect();
        self.scrolled = 0.0;
        self.sort_tiles();

        &self.tiles
    }

    /// Generate, then scroll ahead so the first frame is already in motion
    pub fn generate_with_pre_scroll(&mut self, offset: f32) {
        self.generate();

        let offset = if offset.is_finite() && offset >= 0.0 {
            offset
        } else {
            log::warn!("Ignoring invalid pre-scroll offset {}", offset);
            0.0
        };
        if offset > 0.0 {
            self.update_movement(offset);
        }
    }

    /// Scroll every tile `speed` units up the screen along the diagonal
    pub fn update_movement(&mut self, speed: f32) {
        let drift = speed * self.axis.offset_x_ratio;
        for tile in &mut self.tiles {
            tile.y -= speed;
            tile.x += drift;
        }
        self.scrolled += speed;
        self.sort_tiles();
    }

    pub fn reset(&mut self) {
        self.generate();
    }

    /// Apply debug tuning and regenerate. Rejected tuning leaves the track untouched.
    pub fn retune(&mut self, tuning: TrackTuning) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        let mut axis = self.axis;
        if let Some(chain_height) = tuning.chain_height {
            config.chain_height = chain_height;
        }
        if let Some(zoom_factor) = tuning.zoom_factor {
            config.zoom_factor = zoom_factor;
        }
        if let Some(ratio) = tuning.offset_x_ratio {
            axis.offset_x_ratio = ratio;
        }
        config.validate()?;
        axis.validate()?;

        self.config = config;
        self.axis = axis;
        self.generate();
        Ok(())
    }

    pub fn finish_tile(&self) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.kind == TileKind::Finish)
    }

    pub fn finish_line_y(&self) -> Option<f32> {
        self.finish_tile().map(|t| t.y)
    }

    /// The nearest tile, drawn last
    pub fn last_tile(&self) -> Option<&Tile> {
        self.tiles.last()
    }

    /// Whether the whole ribbon has scrolled past the racers
    pub fn is_exhausted(&self) -> bool {
        self.last_tile()
            .is_some_and(|t| t.y < self.config.exhausted_below_y)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn axis(&self) -> DiagonalAxis {
        self.axis
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Total distance scrolled since the last generate
    pub fn scrolled_distance(&self) -> f32 {
        self.scrolled
    }

    fn sort_tiles(&mut self) {
        self.tiles.sort_by(|a, b| a.y.total_cmp(&b.y));
    }
}
