//! Chunked tile storage and the only API allowed to mutate tile occupancy.
//!
//! Every successful mutation reports a [`TileChange`] to the supplied
//! [`GridObserver`]s before returning, so derived state (islands, cached paths)
//! never lags behind the tiles.

use bevy::prelude::*;
use thiserror::Error;

use crate::config::WorldConfig;
use crate::constants::CHUNK_SIZE;
use crate::map::buildings::{BuildingKind, ResourceRule};
use crate::map::editing::PlacementError;
use crate::map::terrain_gen::TerrainGenerator;
use crate::map::tile_pos::{ChunkPos, MapSize, TilePos};
use crate::map::tiles::{BuildingNode, MarketState, ResourceNode, TerrainType, Tile};
use crate::resources::ResourceType;

/// What an edit did to a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    BuildingPlaced(BuildingKind),
    /// `resource` is set when the building took its own resource node with it
    BuildingRemoved {
        kind: BuildingKind,
        resource: Option<ResourceType>,
    },
    ResourcePlaced(ResourceType),
    ResourceCleared(ResourceType),
}

/// Notification emitted for every successful grid mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileChange {
    pub pos: TilePos,
    pub kind: ChangeKind,
    pub was_walkable: bool,
    pub is_walkable: bool,
}

impl TileChange {
    pub fn became_impassable(&self) -> bool {
        self.was_walkable && !self.is_walkable
    }

    pub fn became_passable(&self) -> bool {
        !self.was_walkable && self.is_walkable
    }
}

/// Derived-state holders that must hear about grid edits
pub trait GridObserver {
    fn on_tile_changed(&mut self, grid: &TileGrid, change: &TileChange);

    /// A chunk was generated after world init
    fn on_chunk_generated(&mut self, _grid: &TileGrid, _chunk: ChunkPos) {}
}

/// Result of damaging a building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Damaged { health: u32 },
    Destroyed(TileChange),
}

/// Result of one harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Harvest {
    pub resource: ResourceType,
    pub quantity: u32,
    /// Set when the harvest used up the node
    pub depleted: Option<TileChange>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsciiMapError {
    #[error("map has no rows")]
    Empty,
    #[error("row {row} has {len} tiles, expected {expected}")]
    RaggedRow { row: usize, len: usize, expected: usize },
    #[error("unknown glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: u32, y: u32 },
}

/// A fixed-size rectangle of tiles, the unit of generation
#[derive(Debug, Clone)]
pub struct Chunk {
    pub pos: ChunkPos,
    origin: TilePos,
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl Chunk {
    pub fn is_generated(&self) -> bool {
        !self.tiles.is_empty()
    }

    /// Positions covered by this chunk, generated or not
    pub fn tile_positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.height).flat_map(move |ly| {
            (0..self.width).map(move |lx| TilePos::new(self.origin.x + lx, self.origin.y + ly))
        })
    }

    fn local_index(&self, pos: TilePos) -> usize {
        ((pos.y - self.origin.y) * self.width + (pos.x - self.origin.x)) as usize
    }
}

#[derive(Resource, Debug, Clone)]
pub struct TileGrid {
    size: MapSize,
    chunk_size: u32,
    chunks_x: u32,
    chunks_y: u32,
    chunks: Vec<Chunk>,
    generator: TerrainGenerator,
    home_base: Option<TilePos>,
}

impl TileGrid {
    /// Empty grid; chunks are generated on demand
    pub fn new(seed: u32, chunk_size: u32, size: MapSize) -> Self {
        let chunks_x = size.x.div_ceil(chunk_size);
        let chunks_y = size.y.div_ceil(chunk_size);
        let mut chunks = Vec::with_capacity((chunks_x * chunks_y) as usize);
        for cy in 0..chunks_y {
            for cx in 0..chunks_x {
                let pos = ChunkPos::new(cx, cy);
                let origin = pos.origin(chunk_size);
                chunks.push(Chunk {
                    pos,
                    origin,
                    width: chunk_size.min(size.x - origin.x),
                    height: chunk_size.min(size.y - origin.y),
                    tiles: Vec::new(),
                });
            }
        }
        Self {
            size,
            chunk_size,
            chunks_x,
            chunks_y,
            chunks,
            generator: TerrainGenerator::new(seed, chunk_size, size),
            home_base: None,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.seed, config.chunk_size, config.map_size())
    }

    /// Build a fully loaded grid from rows of glyphs:
    /// `.` land, `~` water, `^` highland, `=` bridge, `#` wall, `+` road,
    /// `H` home base, `M` market, `r` wood node, `h` harvester on wood, `f` farm
    pub fn from_ascii(rows: &[&str]) -> Result<Self, AsciiMapError> {
        let expected = rows.first().ok_or(AsciiMapError::Empty)?.chars().count();
        for (row, line) in rows.iter().enumerate() {
            let len = line.chars().count();
            if len != expected {
                return Err(AsciiMapError::RaggedRow { row, len, expected });
            }
        }
        let size = MapSize {
            x: expected as u32,
            y: rows.len() as u32,
        };
        let mut grid = Self::new(0, CHUNK_SIZE, size);
        let mut tiles = Vec::with_capacity(size.count());
        for (y, line) in rows.iter().enumerate() {
            for (x, glyph) in line.chars().enumerate() {
                let pos = TilePos::new(x as u32, y as u32);
                tiles.push(tile_from_glyph(pos, glyph)?);
            }
        }
        for tile in tiles {
            if tile
                .building
                .as_ref()
                .is_some_and(|b| b.kind == BuildingKind::HomeBase)
            {
                grid.home_base = Some(tile.pos);
            }
            // Row-major input reaches each chunk in its local row-major order
            if let Some(ci) = grid.chunk_index(tile.pos.chunk(grid.chunk_size)) {
                grid.chunks[ci].tiles.push(tile);
            }
        }
        Ok(grid)
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn home_base(&self) -> Option<TilePos> {
        self.home_base
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Row-major chunk index, `None` outside the chunk grid
    fn chunk_index(&self, chunk: ChunkPos) -> Option<usize> {
        (chunk.x < self.chunks_x && chunk.y < self.chunks_y)
            .then(|| chunk.y as usize * self.chunks_x as usize + chunk.x as usize)
    }

    pub fn chunk(&self, chunk: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(self.chunk_index(chunk)?)
    }

    fn chunk_of(&self, pos: TilePos) -> Option<&Chunk> {
        if !self.size.contains(pos) {
            return None;
        }
        self.chunk(pos.chunk(self.chunk_size))
    }

    pub fn is_chunk_generated(&self, chunk: ChunkPos) -> bool {
        self.chunk(chunk).is_some_and(Chunk::is_generated)
    }

    /// Generate a chunk if it has not been generated yet. Returns true if work was done.
    pub fn generate_chunk(&mut self, chunk: ChunkPos) -> bool {
        let Some(index) = self.chunk_index(chunk) else {
            return false;
        };
        match self.chunks.get(index) {
            Some(c) if !c.is_generated() => {
                let tiles = self.generator.generate_chunk(chunk);
                self.chunks[index].tiles = tiles;
                true
            }
            _ => false,
        }
    }

    pub fn generate_all(&mut self) -> usize {
        let positions: Vec<ChunkPos> = self.chunks.iter().map(|c| c.pos).collect();
        positions
            .into_iter()
            .filter(|&chunk| self.generate_chunk(chunk))
            .count()
    }

    pub fn is_fully_generated(&self) -> bool {
        self.chunks.iter().all(Chunk::is_generated)
    }

    pub fn get_tile(&self, pos: TilePos) -> Option<&Tile> {
        let chunk = self.chunk_of(pos)?;
        chunk.tiles.get(chunk.local_index(pos))
    }

    /// Generate a chunk after world init and let observers absorb its tiles
    pub fn load_chunk(&mut self, chunk: ChunkPos, observers: &mut [&mut dyn GridObserver]) -> bool {
        if !self.generate_chunk(chunk) {
            return false;
        }
        debug!("Loaded chunk ({}, {})", chunk.x, chunk.y);
        for observer in observers.iter_mut() {
            observer.on_chunk_generated(self, chunk);
        }
        true
    }

    /// Like [`get_tile`](Self::get_tile) but loads the owning chunk first
    pub fn tile_or_generate(
        &mut self,
        pos: TilePos,
        observers: &mut [&mut dyn GridObserver],
    ) -> Option<&Tile> {
        if !self.size.contains(pos) {
            return None;
        }
        self.load_chunk(pos.chunk(self.chunk_size), observers);
        self.get_tile(pos)
    }

    fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        if !self.size.contains(pos) {
            return None;
        }
        let index = self.chunk_index(pos.chunk(self.chunk_size))?;
        let chunk = &mut self.chunks[index];
        let local = chunk.local_index(pos);
        chunk.tiles.get_mut(local)
    }

    /// All generated tiles
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.chunks.iter().flat_map(|c| c.tiles.iter())
    }

    /// Loaded cardinal neighbours; works across chunk boundaries
    pub fn neighbors(&self, pos: TilePos) -> impl Iterator<Item = &Tile> {
        pos.cardinal_neighbors(self.size)
            .filter_map(move |n| self.get_tile(n))
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.get_tile(pos).is_some_and(Tile::is_walkable)
    }

    pub fn is_pathable(&self, pos: TilePos) -> bool {
        self.get_tile(pos).is_some_and(Tile::is_resource_pathable)
    }

    pub fn resource_nodes(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.tiles().filter(|t| t.resource.is_some()).map(|t| t.pos)
    }

    pub fn markets(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.tiles()
            .filter(|t| t.building.as_ref().is_some_and(|b| b.market.is_some()))
            .map(|t| t.pos)
    }

    pub fn market(&self, pos: TilePos) -> Option<&MarketState> {
        self.get_tile(pos)?.building.as_ref()?.market.as_ref()
    }

    pub fn market_mut(&mut self, pos: TilePos) -> Option<&mut MarketState> {
        self.tile_mut(pos)?.building.as_mut()?.market.as_mut()
    }

    /// Checks placement rules without mutating anything
    pub fn can_place(&self, pos: TilePos, kind: BuildingKind) -> Result<(), PlacementError> {
        let tile = self.get_tile(pos).ok_or(self.missing(pos))?;
        if tile.building.is_some() {
            return Err(PlacementError::Occupied(pos));
        }
        if !kind.allows_surface(tile.terrain) {
            return Err(PlacementError::WrongSurface {
                kind,
                terrain: tile.terrain,
            });
        }
        match (kind.def().resource_rule, &tile.resource) {
            (ResourceRule::Forbidden | ResourceRule::Places(_), Some(_)) => {
                return Err(PlacementError::ResourcePresent(pos));
            }
            (ResourceRule::Required, None) => return Err(PlacementError::ResourceRequired(pos)),
            _ => {}
        }
        if kind == BuildingKind::HomeBase
            && let Some(existing) = self.home_base
        {
            return Err(PlacementError::HomeBaseExists(existing));
        }
        Ok(())
    }

    pub fn set_building(
        &mut self,
        pos: TilePos,
        kind: BuildingKind,
        observers: &mut [&mut dyn GridObserver],
    ) -> Result<TileChange, PlacementError> {
        self.can_place(pos, kind)?;

        let tile = self.tile_mut(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let was_walkable = tile.is_walkable();
        if let ResourceRule::Places(resource) = kind.def().resource_rule {
            tile.resource = Some(ResourceNode::new(resource));
        }
        tile.building = Some(BuildingNode::new(kind));
        let is_walkable = tile.is_walkable();
        if kind == BuildingKind::HomeBase {
            self.home_base = Some(pos);
        }

        let change = TileChange {
            pos,
            kind: ChangeKind::BuildingPlaced(kind),
            was_walkable,
            is_walkable,
        };
        self.notify(observers, &change);
        Ok(change)
    }

    /// Owner-initiated removal; respects the removable flag
    pub fn clear_building(
        &mut self,
        pos: TilePos,
        observers: &mut [&mut dyn GridObserver],
    ) -> Result<TileChange, PlacementError> {
        let tile = self.get_tile(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let building = tile.building.as_ref().ok_or(PlacementError::NoBuilding(pos))?;
        if !building.is_removable() {
            return Err(PlacementError::NotRemovable(building.kind));
        }
        let was_walkable = tile.is_walkable();
        self.take_building(pos, was_walkable, observers)
    }

    /// `was_walkable` is the tile's state before the edit began, since damage
    /// lowers health before the building is taken
    fn take_building(
        &mut self,
        pos: TilePos,
        was_walkable: bool,
        observers: &mut [&mut dyn GridObserver],
    ) -> Result<TileChange, PlacementError> {
        let tile = self.tile_mut(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let building = tile.building.take().ok_or(PlacementError::NoBuilding(pos))?;
        let resource = match building.kind.def().resource_rule {
            ResourceRule::Places(_) => tile.resource.take().map(|n| n.resource),
            _ => None,
        };
        let is_walkable = tile.is_walkable();
        if self.home_base == Some(pos) {
            self.home_base = None;
        }

        let change = TileChange {
            pos,
            kind: ChangeKind::BuildingRemoved {
                kind: building.kind,
                resource,
            },
            was_walkable,
            is_walkable,
        };
        self.notify(observers, &change);
        Ok(change)
    }

    /// Apply damage; a building reaching zero health is destroyed without refund
    pub fn damage_building(
        &mut self,
        pos: TilePos,
        amount: u32,
        observers: &mut [&mut dyn GridObserver],
    ) -> Result<DamageOutcome, PlacementError> {
        let tile = self.tile_mut(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let was_walkable = tile.is_walkable();
        let building = tile.building.as_mut().ok_or(PlacementError::NoBuilding(pos))?;
        building.health = building.health.saturating_sub(amount);
        if building.health > 0 {
            return Ok(DamageOutcome::Damaged {
                health: building.health,
            });
        }
        let change = self.take_building(pos, was_walkable, observers)?;
        Ok(DamageOutcome::Destroyed(change))
    }

    pub fn set_resource(
        &mut self,
        pos: TilePos,
        resource: ResourceType,
        observers: &mut [&mut dyn GridObserver],
    ) -> Result<TileChange, PlacementError> {
        let missing = self.missing(pos);
        let tile = self.tile_mut(pos).ok_or(missing)?;
        if tile.resource.is_some() {
            return Err(PlacementError::ResourcePresent(pos));
        }
        if tile.building.is_some() {
            return Err(PlacementError::Occupied(pos));
        }
        if !resource.can_spawn_on(tile.terrain) {
            return Err(PlacementError::WrongResourceSurface {
                resource,
                terrain: tile.terrain,
            });
        }
        let was_walkable = tile.is_walkable();
        tile.resource = Some(ResourceNode::new(resource));
        let change = TileChange {
            pos,
            kind: ChangeKind::ResourcePlaced(resource),
            was_walkable,
            is_walkable: tile.is_walkable(),
        };
        self.notify(observers, &change);
        Ok(change)
    }

    pub fn clear_resource(
        &mut self,
        pos: TilePos,
        observers: &mut [&mut dyn GridObserver],
    ) -> Result<TileChange, PlacementError> {
        let tile = self.tile_mut(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let was_walkable = tile.is_walkable();
        let node = tile.resource.take().ok_or(PlacementError::NoResource(pos))?;
        let change = TileChange {
            pos,
            kind: ChangeKind::ResourceCleared(node.resource),
            was_walkable,
            is_walkable: tile.is_walkable(),
        };
        self.notify(observers, &change);
        Ok(change)
    }

    /// Take one harvest from a node; a depleted node is cleared
    pub fn harvest(
        &mut self,
        pos: TilePos,
        observers: &mut [&mut dyn GridObserver],
    ) -> Result<Harvest, PlacementError> {
        let tile = self.tile_mut(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let node = tile.resource.as_mut().ok_or(PlacementError::NoResource(pos))?;
        if node.is_depleted() {
            return Err(PlacementError::NoResource(pos));
        }
        node.durability -= 1;
        let resource = node.resource;
        let depleted = node.is_depleted();
        let depleted = if depleted {
            Some(self.clear_resource(pos, observers)?)
        } else {
            None
        };
        Ok(Harvest {
            resource,
            quantity: resource.def().yield_per_harvest,
            depleted,
        })
    }

    /// Generation-time placement; no observers exist yet
    pub(crate) fn place_natural_resource(&mut self, pos: TilePos, resource: ResourceType) -> bool {
        match self.tile_mut(pos) {
            Some(tile) if tile.resource.is_none() && tile.building.is_none() => {
                tile.resource = Some(ResourceNode::new(resource));
                true
            }
            _ => false,
        }
    }

    /// Overlay replay restores saved health and durability
    pub(crate) fn restore_condition(
        &mut self,
        pos: TilePos,
        health: Option<u32>,
        durability: Option<u32>,
    ) {
        let Some(tile) = self.tile_mut(pos) else {
            return;
        };
        if let (Some(health), Some(building)) = (health, tile.building.as_mut()) {
            building.health = health.clamp(1, building.max_health);
        }
        if let (Some(durability), Some(node)) = (durability, tile.resource.as_mut()) {
            node.durability = durability.max(1);
        }
    }

    fn missing(&self, pos: TilePos) -> PlacementError {
        if self.size.contains(pos) {
            PlacementError::ChunkNotLoaded(pos)
        } else {
            PlacementError::OutOfBounds(pos)
        }
    }

    fn notify(&self, observers: &mut [&mut dyn GridObserver], change: &TileChange) {
        for observer in observers.iter_mut() {
            observer.on_tile_changed(self, change);
        }
    }

    /// ASCII rendering, one line per row
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.size.count() + self.size.y as usize);
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                let glyph = self
                    .get_tile(TilePos::new(x, y))
                    .map(Tile::ascii)
                    .unwrap_or(' ');
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

fn tile_from_glyph(pos: TilePos, glyph: char) -> Result<Tile, AsciiMapError> {
    let (terrain, building, resource) = match glyph {
        '.' => (TerrainType::Land, None, None),
        '~' => (TerrainType::Water, None, None),
        '^' => (TerrainType::Highland, None, None),
        '=' => (TerrainType::Water, Some(BuildingKind::Bridge), None),
        '#' => (TerrainType::Land, Some(BuildingKind::Wall), None),
        '+' => (TerrainType::Land, Some(BuildingKind::Road), None),
        'H' => (TerrainType::Land, Some(BuildingKind::HomeBase), None),
        'M' => (TerrainType::Land, Some(BuildingKind::Market), None),
        'r' => (TerrainType::Land, None, Some(ResourceType::Wood)),
        'h' => (
            TerrainType::Land,
            Some(BuildingKind::Harvester),
            Some(ResourceType::Wood),
        ),
        'f' => (
            TerrainType::Land,
            Some(BuildingKind::Farm),
            Some(ResourceType::Grain),
        ),
        _ => {
            return Err(AsciiMapError::UnknownGlyph {
                glyph,
                x: pos.x,
                y: pos.y,
            });
        }
    };
    let height = match terrain {
        TerrainType::Water => 0.1,
        TerrainType::Land => 0.5,
        TerrainType::Highland => 0.95,
    };
    let mut tile = Tile::new(pos, terrain, height);
    tile.building = building.map(BuildingNode::new);
    tile.resource = resource.map(ResourceNode::new);
    Ok(tile)
}
