use bevy::prelude::*;

use crate::config::WorldConfig;
use crate::economy::transport::PathCache;
use crate::messages::{DamageBuilding, GridChanged, PlaceBuilding, RemoveBuilding};
use crate::tick::SimulationSet;

// Map-related modules
pub mod buildings;
pub mod editing;
pub mod grid;
pub mod islands;
pub mod overlay;
pub mod terrain_gen;
pub mod tile_pos;
pub mod tiles;

// Re-exports for convenience
pub use buildings::{BuildingDef, BuildingKind, ResourceRule};
pub use editing::{PlacementError, WorldEditor};
pub use grid::{ChangeKind, DamageOutcome, GridObserver, Harvest, TileChange, TileGrid};
pub use islands::{InconsistentIslandState, Island, IslandId, IslandTracker};
pub use terrain_gen::{TerrainGenerator, ensure_all_resources};
pub use tile_pos::{ChunkPos, MapSize, TilePos};
pub use tiles::{BuildingNode, MarketState, ResourceNode, TerrainType, Tile};

/// Plugin that generates the world at startup and applies grid edit requests
pub struct MapPlugin;

impl Plugin for MapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldConfig>()
            .add_message::<GridChanged>()
            .add_message::<PlaceBuilding>()
            .add_message::<RemoveBuilding>()
            .add_message::<DamageBuilding>()
            .add_systems(Startup, setup_world)
            .add_systems(Update, apply_grid_edits.in_set(SimulationSet::Edits));
    }
}

/// Freshly generated grid with its derived state
pub struct GeneratedWorld {
    pub grid: TileGrid,
    pub islands: IslandTracker,
    pub cache: PathCache,
}

/// Generate every chunk, guarantee each natural resource spawns, place the home
/// base, then sweep islands and compute every route.
pub fn generate_world(config: &WorldConfig) -> GeneratedWorld {
    let mut grid = TileGrid::from_config(config);
    let chunks = grid.generate_all();
    let forced = ensure_all_resources(&mut grid);
    if !forced.is_empty() {
        debug!("Forced {} missing resources onto the map", forced.len());
    }

    match place_home_base(&mut grid, config.home_base) {
        Some(pos) => info!("Home base placed at ({}, {})", pos.x, pos.y),
        None => warn!("No tile can hold the home base; routes stay unavailable"),
    }

    let islands = IslandTracker::from_grid(&grid);
    let mut cache = PathCache::from_grid(&grid);
    cache.recompute_stale(&grid, &islands);
    info!(
        "Generated {} chunks ({}x{} tiles), {} islands, {} resource nodes",
        chunks,
        grid.size().x,
        grid.size().y,
        islands.island_count(),
        grid.resource_nodes().count()
    );
    GeneratedWorld {
        grid,
        islands,
        cache,
    }
}

/// The configured tile if it accepts a home base, otherwise the nearest tile to
/// the map centre that does
fn place_home_base(grid: &mut TileGrid, preferred: Option<TilePos>) -> Option<TilePos> {
    let preferred = preferred.filter(|&pos| {
        let allowed = grid.can_place(pos, BuildingKind::HomeBase);
        if let Err(err) = &allowed {
            warn!("Configured home base rejected: {}", err);
        }
        allowed.is_ok()
    });
    let pos = preferred.or_else(|| {
        let centre = grid.size().center();
        let mut candidates: Vec<TilePos> = grid
            .size()
            .iter()
            .filter(|&pos| grid.can_place(pos, BuildingKind::HomeBase).is_ok())
            .collect();
        candidates.sort_by_key(|&pos| (pos.manhattan(centre), pos));
        candidates.first().copied()
    })?;
    grid.set_building(pos, BuildingKind::HomeBase, &mut []).ok()?;
    Some(pos)
}

/// Startup system; leaves a grid that was inserted up front alone
pub fn setup_world(
    mut commands: Commands,
    config: Res<WorldConfig>,
    existing: Option<Res<TileGrid>>,
) {
    if existing.is_some() {
        return;
    }
    let config = match config.validate() {
        Ok(()) => (*config).clone(),
        Err(err) => {
            warn!("Invalid world config ({}), using defaults", err);
            WorldConfig::default()
        }
    };
    let world = generate_world(&config);
    commands.insert_resource(world.grid);
    commands.insert_resource(world.islands);
    commands.insert_resource(world.cache);
}

/// Apply placement, removal and damage requests through the edit layer
pub fn apply_grid_edits(
    mut place: MessageReader<PlaceBuilding>,
    mut remove: MessageReader<RemoveBuilding>,
    mut damage: MessageReader<DamageBuilding>,
    mut editor: WorldEditor,
) {
    for request in place.read() {
        if let Err(err) = editor.place(request.pos, request.kind) {
            warn!("Cannot place {:?} at {:?}: {}", request.kind, request.pos, err);
        }
    }
    for request in remove.read() {
        if let Err(err) = editor.remove(request.pos) {
            warn!("Cannot remove building at {:?}: {}", request.pos, err);
        }
    }
    for request in damage.read() {
        match editor.damage(request.pos, request.amount) {
            Ok(DamageOutcome::Destroyed(change)) => {
                info!("Building at {:?} destroyed: {:?}", change.pos, change.kind);
            }
            Ok(DamageOutcome::Damaged { .. }) => {}
            Err(err) => warn!("Cannot damage building at {:?}: {}", request.pos, err),
        }
    }
}
