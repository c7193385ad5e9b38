use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    CHUNK_SIZE, DEFAULT_CHUNKS_X, DEFAULT_CHUNKS_Y, PATH_BUDGET_PER_TICK, SHIPMENT_RETRY_BUDGET,
    SHIPMENT_SPEED, STARTING_MONEY, TERRAIN_SEED,
};
use crate::map::tile_pos::{MapSize, TilePos};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("world must contain at least one chunk (got {chunks_x}x{chunks_y})")]
    EmptyWorld { chunks_x: u32, chunks_y: u32 },
    #[error("chunk size must be non-zero")]
    ZeroChunkSize,
    #[error("home base ({}, {}) lies outside the {}x{} map", .pos.x, .pos.y, .size.x, .size.y)]
    HomeBaseOutOfBounds { pos: TilePos, size: MapSize },
    #[error("shipment speed must be positive (got {0})")]
    InvalidShipmentSpeed(f32),
}

/// Parameters for building a world and running its logistics.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u32,
    pub chunks_x: u32,
    pub chunks_y: u32,
    pub chunk_size: u32,
    /// Explicit home base tile; `None` picks the walkable tile nearest the centre
    pub home_base: Option<TilePos>,
    pub starting_money: u32,
    pub path_budget_per_tick: usize,
    /// Tiles per second
    pub shipment_speed: f32,
    pub shipment_retry_budget: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: TERRAIN_SEED,
            chunks_x: DEFAULT_CHUNKS_X,
            chunks_y: DEFAULT_CHUNKS_Y,
            chunk_size: CHUNK_SIZE,
            home_base: None,
            starting_money: STARTING_MONEY,
            path_budget_per_tick: PATH_BUDGET_PER_TICK,
            shipment_speed: SHIPMENT_SPEED,
            shipment_retry_budget: SHIPMENT_RETRY_BUDGET,
        }
    }
}

impl WorldConfig {
    pub fn map_size(&self) -> MapSize {
        MapSize {
            x: self.chunks_x * self.chunk_size,
            y: self.chunks_y * self.chunk_size,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunks_x == 0 || self.chunks_y == 0 {
            return Err(ConfigError::EmptyWorld {
                chunks_x: self.chunks_x,
                chunks_y: self.chunks_y,
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.shipment_speed <= 0.0 || !self.shipment_speed.is_finite() {
            return Err(ConfigError::InvalidShipmentSpeed(self.shipment_speed));
        }
        let size = self.map_size();
        if let Some(pos) = self.home_base
            && !size.contains(pos)
        {
            return Err(ConfigError::HomeBaseOutOfBounds { pos, size });
        }
        Ok(())
    }
}
