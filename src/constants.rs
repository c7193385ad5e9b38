//! World and logistics constants
//!
//! This module centralizes all magic numbers and tuning values used by the simulation core.

// ============================================================================
// WORLD LAYOUT
// ============================================================================

/// Tiles along one edge of a generation chunk
pub const CHUNK_SIZE: u32 = 16;

/// Default world size in chunks (each axis)
pub const DEFAULT_CHUNKS_X: u32 = 8;
pub const DEFAULT_CHUNKS_Y: u32 = 8;

/// Default seed for consistent worlds
pub const TERRAIN_SEED: u32 = 12345;

/// Money available before anything is built
pub const STARTING_MONEY: u32 = 5_000;

// ============================================================================
// TERRAIN GENERATION
// ============================================================================

/// Weights of the primary octave and the two detail octaves
pub const OCTAVE_WEIGHTS: [f64; 3] = [1.0, 0.25, 0.125];

/// Frequency multipliers matching `OCTAVE_WEIGHTS`
pub const OCTAVE_FREQUENCIES: [f64; 3] = [1.0, 2.0, 4.0];

/// Noise periods per chunk for the primary octave
pub const ELEVATION_SCALE: f64 = 0.35;

/// Power applied to the normalized elevation sample (flattens low terrain)
pub const ELEVATION_EXPONENT: f64 = 1.5;

/// Elevation at or below this is Water
pub const WATER_THRESHOLD: f64 = 0.2;

/// Elevation below this is Land, anything above is Highland
pub const LAND_THRESHOLD: f64 = 0.9;

/// Seed offset for the resource placement noise field
pub const RESOURCE_SEED_OFFSET: u32 = 7919;

/// Noise periods per chunk for the resource field
pub const RESOURCE_SCALE: f64 = 2.5;

/// Resource sample must be a strict maximum within this Chebyshev radius
pub const RESOURCE_NMS_RADIUS: i32 = 2;

/// Normalized resource sample required before a local maximum becomes a candidate
pub const RESOURCE_MIN_SAMPLE: f64 = 0.55;

/// Distance from world centre covered by one resource tier
pub const TIER_RING_WIDTH: f64 = 24.0;

/// Spawn-rate multiplier for resources whose tier matches the tile tier
pub const MATCHING_TIER_BIAS: f64 = 3.0;

// ============================================================================
// PATHFINDING
// ============================================================================

/// Cost of stepping onto a resource node or a resource-pathable building
pub const ROAD_STEP_COST: u32 = 1;

/// Cost of stepping onto plain walkable terrain
pub const TERRAIN_STEP_COST: u32 = 5;

/// Node expansions spent on pending asynchronous path requests per tick
pub const PATH_BUDGET_PER_TICK: usize = 4_096;

// ============================================================================
// LOGISTICS
// ============================================================================

/// Shipment travel speed in tiles per second
pub const SHIPMENT_SPEED: f32 = 4.0;

/// Ticks a waiting shipment may retry before it is dropped
pub const SHIPMENT_RETRY_BUDGET: u32 = 30;

/// Percentage of the build cost refunded when a building is removed
pub const REMOVAL_REFUND_PERCENT: u32 = 50;
