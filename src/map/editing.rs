//! The edit layer: every occupancy change goes through here so the island
//! tracker and the path cache hear about it before the caller gets control back.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use thiserror::Error;

use crate::economy::Treasury;
use crate::economy::transport::PathCache;
use crate::map::buildings::BuildingKind;
use crate::map::grid::{ChangeKind, DamageOutcome, GridObserver, Harvest, TileChange, TileGrid};
use crate::map::islands::IslandTracker;
use crate::map::tile_pos::{ChunkPos, TilePos};
use crate::map::tiles::TerrainType;
use crate::messages::GridChanged;
use crate::resources::ResourceType;

/// Why an edit was rejected. A rejected edit never changes any state.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum PlacementError {
    #[error("tile {0:?} is outside the map")]
    OutOfBounds(TilePos),
    #[error("chunk containing {0:?} has not been generated")]
    ChunkNotLoaded(TilePos),
    #[error("tile {0:?} already has a building")]
    Occupied(TilePos),
    #[error("{kind:?} cannot be built on {terrain:?}")]
    WrongSurface {
        kind: BuildingKind,
        terrain: TerrainType,
    },
    #[error("tile {0:?} already holds a resource node")]
    ResourcePresent(TilePos),
    #[error("tile {0:?} has no resource to build on")]
    ResourceRequired(TilePos),
    #[error("{resource:?} cannot spawn on {terrain:?}")]
    WrongResourceSurface {
        resource: ResourceType,
        terrain: TerrainType,
    },
    #[error("home base already placed at {0:?}")]
    HomeBaseExists(TilePos),
    #[error("{0:?} cannot be removed")]
    NotRemovable(BuildingKind),
    #[error("no building at {0:?}")]
    NoBuilding(TilePos),
    #[error("no resource node at {0:?}")]
    NoResource(TilePos),
    #[error("costs {cost}, only {available} available")]
    CannotAfford { cost: u32, available: u32 },
}

pub fn place_building(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    pos: TilePos,
    kind: BuildingKind,
) -> Result<TileChange, PlacementError> {
    grid.set_building(pos, kind, &mut [islands, cache])
}

pub fn remove_building(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    pos: TilePos,
) -> Result<TileChange, PlacementError> {
    grid.clear_building(pos, &mut [islands, cache])
}

pub fn damage_building(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    pos: TilePos,
    amount: u32,
) -> Result<DamageOutcome, PlacementError> {
    grid.damage_building(pos, amount, &mut [islands, cache])
}

pub fn set_resource(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    pos: TilePos,
    resource: ResourceType,
) -> Result<TileChange, PlacementError> {
    grid.set_resource(pos, resource, &mut [islands, cache])
}

pub fn clear_resource(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    pos: TilePos,
) -> Result<TileChange, PlacementError> {
    grid.clear_resource(pos, &mut [islands, cache])
}

pub fn harvest(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    pos: TilePos,
) -> Result<Harvest, PlacementError> {
    grid.harvest(pos, &mut [islands, cache])
}

/// ECS access to the edit layer. Charges and refunds building costs and
/// publishes a [`GridChanged`] for every applied change.
#[derive(SystemParam)]
pub struct WorldEditor<'w> {
    grid: ResMut<'w, TileGrid>,
    islands: ResMut<'w, IslandTracker>,
    cache: ResMut<'w, PathCache>,
    treasury: ResMut<'w, Treasury>,
    changed: MessageWriter<'w, GridChanged>,
}

impl WorldEditor<'_> {
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn islands(&self) -> &IslandTracker {
        &self.islands
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn place(&mut self, pos: TilePos, kind: BuildingKind) -> Result<TileChange, PlacementError> {
        self.grid.can_place(pos, kind)?;
        let cost = kind.def().cost;
        let available = self.treasury.total();
        if available < cost {
            return Err(PlacementError::CannotAfford { cost, available });
        }
        let change = place_building(&mut self.grid, &mut self.islands, &mut self.cache, pos, kind)?;
        self.treasury.subtract(cost);
        self.changed.write(GridChanged { change });
        Ok(change)
    }

    pub fn remove(&mut self, pos: TilePos) -> Result<TileChange, PlacementError> {
        let change = remove_building(&mut self.grid, &mut self.islands, &mut self.cache, pos)?;
        if let ChangeKind::BuildingRemoved { kind, .. } = change.kind {
            self.treasury.add(kind.refund());
        }
        self.changed.write(GridChanged { change });
        Ok(change)
    }

    pub fn damage(&mut self, pos: TilePos, amount: u32) -> Result<DamageOutcome, PlacementError> {
        let outcome = damage_building(
            &mut self.grid,
            &mut self.islands,
            &mut self.cache,
            pos,
            amount,
        )?;
        if let DamageOutcome::Destroyed(change) = outcome {
            self.changed.write(GridChanged { change });
        }
        Ok(outcome)
    }

    pub fn set_resource(
        &mut self,
        pos: TilePos,
        resource: ResourceType,
    ) -> Result<TileChange, PlacementError> {
        let change = set_resource(
            &mut self.grid,
            &mut self.islands,
            &mut self.cache,
            pos,
            resource,
        )?;
        self.changed.write(GridChanged { change });
        Ok(change)
    }

    pub fn clear_resource(&mut self, pos: TilePos) -> Result<TileChange, PlacementError> {
        let change = clear_resource(&mut self.grid, &mut self.islands, &mut self.cache, pos)?;
        self.changed.write(GridChanged { change });
        Ok(change)
    }

    pub fn harvest(&mut self, pos: TilePos) -> Result<Harvest, PlacementError> {
        let result = harvest(&mut self.grid, &mut self.islands, &mut self.cache, pos)?;
        if let Some(change) = result.depleted {
            self.changed.write(GridChanged { change });
        }
        Ok(result)
    }

    /// Generate a chunk after world init, feeding its tiles to the tracker and cache
    pub fn load_chunk(&mut self, chunk: ChunkPos) -> bool {
        let Self {
            grid, islands, cache, ..
        } = self;
        let observers: &mut [&mut dyn GridObserver] = &mut [&mut **islands, &mut **cache];
        grid.load_chunk(chunk, observers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_functions_keep_derived_state_current() {
        let mut grid = TileGrid::from_ascii(&["r..H"]).unwrap();
        let mut islands = IslandTracker::from_grid(&grid);
        let mut cache = PathCache::from_grid(&grid);
        cache.recompute_stale(&grid, &islands);
        assert!(cache.path_available(TilePos::new(0, 0)));

        let wall = TilePos::new(2, 0);
        place_building(&mut grid, &mut islands, &mut cache, wall, BuildingKind::Wall).unwrap();
        assert!(cache.is_stale(TilePos::new(0, 0)));
        assert!(!islands.is_same_island(TilePos::new(0, 0), TilePos::new(3, 0)));

        remove_building(&mut grid, &mut islands, &mut cache, wall).unwrap();
        islands.assert_consistent(&grid);
        cache.recompute_stale(&grid, &islands);
        assert!(cache.path_available(TilePos::new(0, 0)));
    }

    #[test]
    fn destroyed_bridge_splits_islands_and_can_be_rebuilt() {
        let mut grid = TileGrid::from_ascii(&["r=H"]).unwrap();
        let mut islands = IslandTracker::from_grid(&grid);
        let mut cache = PathCache::from_grid(&grid);
        cache.recompute_stale(&grid, &islands);
        let (node, bridge, home) = (TilePos::new(0, 0), TilePos::new(1, 0), TilePos::new(2, 0));

        let outcome = damage_building(&mut grid, &mut islands, &mut cache, bridge, 10_000).unwrap();
        let DamageOutcome::Destroyed(change) = outcome else {
            panic!("bridge survived");
        };
        assert!(change.became_impassable());
        assert_eq!(islands.validate(&grid), Ok(()));
        assert_eq!(islands.island_count(), 2);
        assert_eq!(islands.island_id(bridge), None);
        assert!(!islands.is_same_island(node, home));
        assert!(cache.is_stale(node));

        place_building(&mut grid, &mut islands, &mut cache, bridge, BuildingKind::Bridge).unwrap();
        assert_eq!(islands.validate(&grid), Ok(()));
        assert!(islands.is_same_island(node, home));
        cache.recompute_stale(&grid, &islands);
        assert!(cache.path_available(node));
    }

    #[test]
    fn rejected_edit_touches_nothing() {
        let mut grid = TileGrid::from_ascii(&["~.H"]).unwrap();
        let mut islands = IslandTracker::from_grid(&grid);
        let mut cache = PathCache::from_grid(&grid);
        let before = islands.allocated_ids();

        let err = place_building(
            &mut grid,
            &mut islands,
            &mut cache,
            TilePos::new(0, 0),
            BuildingKind::Road,
        );
        assert_eq!(
            err,
            Err(PlacementError::WrongSurface {
                kind: BuildingKind::Road,
                terrain: TerrainType::Water
            })
        );
        assert_eq!(islands.allocated_ids(), before);
        assert_eq!(grid.render_ascii(), "~.H\n");
    }
}
