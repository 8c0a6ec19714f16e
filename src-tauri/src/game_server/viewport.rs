//! Viewport - What the frontend draws each frame
//!
//! Culls tiles against the canvas with generous margins and snaps positions
//! to whole pixels. Tiles keep the track's back-to-front order.

use serde::{Deserialize, Serialize};

use crate::game_server::config::TileKind;
use crate::game_server::error::ConfigError;
use crate::game_server::track::Tile;

/// Canvas size and culling margins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Wide horizontal margin so diagonal drift does not pop tiles at the edges
    pub margin_x: f32,
    pub margin_y: f32,
    /// Extra pixels on each tile to hide seams between neighbours
    pub overdraw: f32,
    pub racer_sprite_size: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 1800.0,
            margin_x: 1000.0,
            margin_y: 500.0,
            overdraw: 2.0,
            racer_sprite_size: 600.0,
        }
    }
}

/// One tile draw call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDraw {
    pub asset: TileKind,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("viewport.width", self.width),
            ("viewport.height", self.height),
            ("viewport.racer_sprite_size", self.racer_sprite_size),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }
        for (field, value) in [
            ("viewport.margin_x", self.margin_x),
            ("viewport.margin_y", self.margin_y),
            ("viewport.overdraw", self.overdraw),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }
        Ok(())
    }

    /// Whether any part of the tile falls inside the padded canvas
    pub fn is_visible(&self, tile: &Tile) -> bool {
        if tile.y > self.height + self.margin_y || tile.y + tile.height < -self.margin_y {
            return false;
        }
        if tile.x > self.width + self.margin_x || tile.x + tile.width < -self.margin_x {
            return false;
        }
        true
    }

    /// Draw calls for the visible tiles, in the order given
    pub fn tile_draws(&self, tiles: &[Tile]) -> Vec<TileDraw> {
        tiles
            .iter()
            .filter(|tile| self.is_visible(tile))
            .map(|tile| TileDraw {
                asset: tile.kind,
                x: tile.x.floor() as i32,
                y: tile.y.floor() as i32,
                width: (tile.width.ceil() + self.overdraw) as i32,
                height: (tile.height.ceil() + self.overdraw) as i32,
            })
            .collect()
    }
}
