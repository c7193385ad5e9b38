use bevy::prelude::*;
use noise::{NoiseFn, Perlin};
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::constants::{
    ELEVATION_EXPONENT, ELEVATION_SCALE, LAND_THRESHOLD, MATCHING_TIER_BIAS, OCTAVE_FREQUENCIES,
    OCTAVE_WEIGHTS, RESOURCE_MIN_SAMPLE, RESOURCE_NMS_RADIUS, RESOURCE_SCALE,
    RESOURCE_SEED_OFFSET, TIER_RING_WIDTH, WATER_THRESHOLD,
};
use crate::map::grid::TileGrid;
use crate::map::tile_pos::{ChunkPos, MapSize, TilePos};
use crate::map::tiles::{ResourceNode, TerrainType, Tile};
use crate::resources::{MAX_TIER, ResourceType, natural_resources};

/// Deterministic per-chunk terrain and resource placement.
#[derive(Clone)]
pub struct TerrainGenerator {
    seed: u32,
    chunk_size: u32,
    map_size: MapSize,
    elevation_noise: Perlin,
    resource_noise: Perlin,
}

impl std::fmt::Debug for TerrainGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainGenerator")
            .field("seed", &self.seed)
            .field("chunk_size", &self.chunk_size)
            .field("map_size", &self.map_size)
            .finish()
    }
}

impl TerrainGenerator {
    pub fn new(seed: u32, chunk_size: u32, map_size: MapSize) -> Self {
        Self {
            seed,
            chunk_size,
            map_size,
            // Independent field for resources so placement does not follow coastlines
            elevation_noise: Perlin::new(seed),
            resource_noise: Perlin::new(seed.wrapping_add(RESOURCE_SEED_OFFSET)),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Coordinates in chunk units, so each chunk spans `[cx, cx + 1)`
    fn normalized(&self, x: i64, y: i64) -> (f64, f64) {
        let size = self.chunk_size as f64;
        (x as f64 / size, y as f64 / size)
    }

    /// Height in `[0, 1]` biased toward low values
    pub fn sample_height(&self, pos: TilePos) -> f64 {
        let (nx, ny) = self.normalized(pos.x as i64, pos.y as i64);
        let total_weight: f64 = OCTAVE_WEIGHTS.iter().sum();
        let raw: f64 = OCTAVE_WEIGHTS
            .iter()
            .zip(OCTAVE_FREQUENCIES)
            .map(|(weight, freq)| {
                let scale = ELEVATION_SCALE * freq;
                weight * self.elevation_noise.get([nx * scale, ny * scale])
            })
            .sum::<f64>()
            / total_weight;
        let normalized = ((raw + 1.0) / 2.0).clamp(0.0, 1.0);
        normalized.powf(ELEVATION_EXPONENT)
    }

    pub fn classify(height: f64) -> TerrainType {
        if height <= WATER_THRESHOLD {
            TerrainType::Water
        } else if height < LAND_THRESHOLD {
            TerrainType::Land
        } else {
            TerrainType::Highland
        }
    }

    /// Normalized resource field sample; defined outside the map too so suppression
    /// gives the same answer regardless of which chunk asks
    pub fn resource_sample(&self, x: i64, y: i64) -> f64 {
        let (nx, ny) = self.normalized(x, y);
        let v = self
            .resource_noise
            .get([nx * RESOURCE_SCALE, ny * RESOURCE_SCALE]);
        ((v + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    /// Non-maximum suppression: only strict local maxima above the floor survive
    pub fn is_resource_candidate(&self, pos: TilePos) -> bool {
        let (x, y) = (pos.x as i64, pos.y as i64);
        let center = self.resource_sample(x, y);
        if center < RESOURCE_MIN_SAMPLE {
            return false;
        }
        let r = RESOURCE_NMS_RADIUS as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                if (dx, dy) == (0, 0) {
                    continue;
                }
                if self.resource_sample(x + dx, y + dy) >= center {
                    return false;
                }
            }
        }
        true
    }

    /// Resource tier grows with distance from the map centre
    pub fn tier_at(&self, pos: TilePos) -> u32 {
        let center = self.map_size.center();
        let dx = pos.x as f64 - center.x as f64;
        let dy = pos.y as f64 - center.y as f64;
        let ring = ((dx * dx + dy * dy).sqrt() / TIER_RING_WIDTH) as u32;
        ring.min(MAX_TIER)
    }

    /// Weighted draw among resources allowed on this tile
    pub fn choose_resource(
        &self,
        pos: TilePos,
        terrain: TerrainType,
        rng: &mut StdRng,
    ) -> Option<ResourceType> {
        let tier = self.tier_at(pos);
        let eligible: Vec<(ResourceType, f64)> = natural_resources()
            .filter(|def| def.tier <= tier && def.surfaces.contains(&terrain))
            .map(|def| {
                let bias = if def.tier == tier { MATCHING_TIER_BIAS } else { 1.0 };
                (def.resource, def.spawn_rate * bias)
            })
            .collect();
        let weights = WeightedIndex::new(eligible.iter().map(|(_, w)| *w)).ok()?;
        Some(eligible[weights.sample(rng)].0)
    }

    pub fn chunk_rng(&self, chunk: ChunkPos) -> StdRng {
        StdRng::seed_from_u64(chunk_seed(self.seed, chunk))
    }

    /// Tiles of one chunk in row-major order, clipped at the map bounds
    pub fn generate_chunk(&self, chunk: ChunkPos) -> Vec<Tile> {
        let origin = chunk.origin(self.chunk_size);
        let width = self.chunk_size.min(self.map_size.x.saturating_sub(origin.x));
        let height = self.chunk_size.min(self.map_size.y.saturating_sub(origin.y));
        let mut rng = self.chunk_rng(chunk);
        let mut tiles = Vec::with_capacity((width * height) as usize);

        for ly in 0..height {
            for lx in 0..width {
                let pos = TilePos::new(origin.x + lx, origin.y + ly);
                let h = self.sample_height(pos);
                let terrain = Self::classify(h);
                let mut tile = Tile::new(pos, terrain, h as f32);
                if !terrain.is_water() && self.is_resource_candidate(pos) {
                    tile.resource = self
                        .choose_resource(pos, terrain, &mut rng)
                        .map(ResourceNode::new);
                }
                tiles.push(tile);
            }
        }
        tiles
    }
}

/// SplitMix64 over the world seed and chunk coordinates
fn chunk_seed(seed: u32, chunk: ChunkPos) -> u64 {
    let mut z = (u64::from(seed) << 32)
        ^ (u64::from(chunk.x) << 16)
        ^ u64::from(chunk.y)
        ^ 0x9E37_79B9_7F4A_7C15;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Force-place every naturally spawning resource that the random process missed.
/// Must run after all chunks are generated. Returns the forced placements.
pub fn ensure_all_resources(grid: &mut TileGrid) -> Vec<(TilePos, ResourceType)> {
    let mut present = std::collections::HashSet::new();
    for tile in grid.tiles() {
        if let Some(node) = &tile.resource {
            present.insert(node.resource);
        }
    }

    let mut forced = Vec::new();
    for (i, def) in natural_resources().enumerate() {
        if present.contains(&def.resource) {
            continue;
        }
        let free: Vec<&Tile> = grid
            .tiles()
            .filter(|t| t.resource.is_none() && t.building.is_none())
            .filter(|t| def.surfaces.contains(&t.terrain))
            .collect();
        let in_tier: Vec<TilePos> = free
            .iter()
            .filter(|t| grid.generator().tier_at(t.pos) == def.tier)
            .map(|t| t.pos)
            .collect();
        let pool: Vec<TilePos> = if in_tier.is_empty() {
            free.iter().map(|t| t.pos).collect()
        } else {
            in_tier
        };

        let mut rng = StdRng::seed_from_u64(u64::from(grid.generator().seed()) ^ (i as u64 + 1));
        let Some(&pos) = pool.choose(&mut rng) else {
            warn!("No surface available to force-place {:?}", def.resource);
            continue;
        };
        if grid.place_natural_resource(pos, def.resource) {
            forced.push((pos, def.resource));
        }
    }

    if !forced.is_empty() {
        info!("Force-placed {} missing resource types", forced.len());
    }
    forced
}
