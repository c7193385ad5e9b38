//! Replaying recorded edits onto freshly generated terrain.
//!
//! Terrain regenerates from the seed, so a saved world only needs the tiles
//! that changed since generation. Replay bypasses the observers and then
//! resynchronises the island tracker and path cache in one go.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::economy::transport::PathCache;
use crate::map::buildings::BuildingKind;
use crate::map::editing::PlacementError;
use crate::map::grid::TileGrid;
use crate::map::islands::IslandTracker;
use crate::map::tile_pos::TilePos;
use crate::resources::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayKind {
    Building {
        kind: BuildingKind,
        /// Saved health; `None` means undamaged
        health: Option<u32>,
    },
    Resource {
        resource: ResourceType,
        durability: Option<u32>,
    },
    /// A generated resource node that was harvested to depletion or cleared
    ClearResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    pub pos: TilePos,
    pub kind: OverlayKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverlayError {
    #[error("overlay #{index} at {pos:?} rejected: {source}")]
    Rejected {
        index: usize,
        pos: TilePos,
        #[source]
        source: PlacementError,
    },
}

/// Replay `overlays` in order, then re-sweep every island and re-register every
/// route. Stops at the first rejected overlay; earlier ones stay applied and the
/// derived state is resynchronised either way.
pub fn apply_overlays(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    overlays: &[Overlay],
) -> Result<usize, OverlayError> {
    let result = overlays
        .iter()
        .enumerate()
        .try_for_each(|(index, overlay)| {
            replay(grid, overlay).map_err(|source| OverlayError::Rejected {
                index,
                pos: overlay.pos,
                source,
            })
        });
    islands.process_islands(grid, None);
    cache.rebuild(grid);
    result.map(|()| overlays.len())
}

/// Replay one overlay and re-flood only the islands around its tile
pub fn apply_overlay(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    overlay: &Overlay,
) -> Result<(), PlacementError> {
    replay(grid, overlay)?;
    let size = grid.size();
    islands.process_islands(grid, Some(overlay.pos));
    for neighbor in overlay.pos.cardinal_neighbors(size) {
        if grid.is_walkable(neighbor) {
            islands.process_islands(grid, Some(neighbor));
        }
    }
    cache.rebuild(grid);
    Ok(())
}

fn replay(grid: &mut TileGrid, overlay: &Overlay) -> Result<(), PlacementError> {
    let pos = overlay.pos;
    match overlay.kind {
        OverlayKind::Building { kind, health } => {
            grid.set_building(pos, kind, &mut [])?;
            grid.restore_condition(pos, health, None);
        }
        OverlayKind::Resource {
            resource,
            durability,
        } => {
            grid.set_resource(pos, resource, &mut [])?;
            grid.restore_condition(pos, None, durability);
        }
        OverlayKind::ClearResource => {
            grid.clear_resource(pos, &mut [])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derived(grid: &TileGrid) -> (IslandTracker, PathCache) {
        (IslandTracker::from_grid(grid), PathCache::from_grid(grid))
    }

    #[test]
    fn replayed_bridge_joins_islands() {
        let mut grid = TileGrid::from_ascii(&["r.~.H"]).unwrap();
        let (mut islands, mut cache) = derived(&grid);
        assert_eq!(islands.island_count(), 2);

        let overlays = [
            Overlay {
                pos: TilePos::new(2, 0),
                kind: OverlayKind::Building {
                    kind: BuildingKind::Bridge,
                    health: Some(5),
                },
            },
            Overlay {
                pos: TilePos::new(1, 0),
                kind: OverlayKind::Resource {
                    resource: ResourceType::Stone,
                    durability: Some(3),
                },
            },
        ];
        assert_eq!(
            apply_overlays(&mut grid, &mut islands, &mut cache, &overlays),
            Ok(2)
        );
        assert_eq!(islands.island_count(), 1);
        islands.assert_consistent(&grid);

        let bridge = grid.get_tile(TilePos::new(2, 0)).unwrap();
        assert_eq!(bridge.building.as_ref().map(|b| b.health), Some(5));
        let stone = grid.get_tile(TilePos::new(1, 0)).unwrap();
        assert_eq!(stone.resource.as_ref().map(|n| n.durability), Some(3));

        assert_eq!(cache.stale_count(), 2);
        cache.recompute_stale(&grid, &islands);
        assert!(cache.path_available(TilePos::new(0, 0)));
    }

    #[test]
    fn rejected_overlay_reports_its_index() {
        let mut grid = TileGrid::from_ascii(&["..~H"]).unwrap();
        let (mut islands, mut cache) = derived(&grid);
        let overlays = [
            Overlay {
                pos: TilePos::new(0, 0),
                kind: OverlayKind::Building {
                    kind: BuildingKind::Wall,
                    health: None,
                },
            },
            Overlay {
                pos: TilePos::new(1, 0),
                kind: OverlayKind::ClearResource,
            },
        ];
        assert_eq!(
            apply_overlays(&mut grid, &mut islands, &mut cache, &overlays),
            Err(OverlayError::Rejected {
                index: 1,
                pos: TilePos::new(1, 0),
                source: PlacementError::NoResource(TilePos::new(1, 0)),
            })
        );
        // The wall before it is kept and the tracker knows about it
        assert!(!grid.is_walkable(TilePos::new(0, 0)));
        islands.assert_consistent(&grid);
    }

    #[test]
    fn single_overlay_splits_an_island_locally() {
        let mut grid = TileGrid::from_ascii(&["...", "...", "..."]).unwrap();
        let (mut islands, mut cache) = derived(&grid);
        for x in 0..3 {
            let wall = Overlay {
                pos: TilePos::new(x, 1),
                kind: OverlayKind::Building {
                    kind: BuildingKind::Wall,
                    health: None,
                },
            };
            apply_overlay(&mut grid, &mut islands, &mut cache, &wall).unwrap();
            islands.assert_consistent(&grid);
        }
        assert_eq!(islands.island_count(), 2);
        assert!(!islands.is_same_island(TilePos::new(0, 0), TilePos::new(0, 2)));
    }
}
