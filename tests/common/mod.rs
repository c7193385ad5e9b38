#![allow(dead_code)]

use bevy::ecs::message::Message;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use tile_logistics::LogicPlugins;
use tile_logistics::config::WorldConfig;
use tile_logistics::economy::PathCache;
use tile_logistics::map::{IslandTracker, TileGrid, TilePos};

pub fn grid(rows: &[&str]) -> TileGrid {
    TileGrid::from_ascii(rows).unwrap()
}

/// Headless app running every logic plugin over a hand-drawn map.
/// Time only moves through [`step`].
pub fn logic_app(rows: &[&str], config: WorldConfig) -> App {
    let grid = grid(rows);
    let islands = IslandTracker::from_grid(&grid);
    let mut cache = PathCache::from_grid(&grid);
    cache.recompute_stale(&grid, &islands);

    let mut app = App::new();
    app.insert_resource(config)
        .insert_resource(grid)
        .insert_resource(islands)
        .insert_resource(cache)
        .init_resource::<Time>()
        .add_plugins(LogicPlugins);
    app
}

pub fn step(app: &mut App, seconds: f32) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_secs_f32(seconds));
    app.update();
}

pub fn send<M: Message>(app: &mut App, message: M) {
    app.world_mut().resource_mut::<Messages<M>>().write(message);
}

/// Take every queued message of type `M`, so later calls never see it again
pub fn drain<M: Message>(app: &mut App) -> Vec<M> {
    app.world_mut().resource_mut::<Messages<M>>().drain().collect()
}

/// Connected components of walkable tiles by plain breadth-first search
pub fn components(grid: &TileGrid) -> Vec<HashSet<TilePos>> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for pos in grid.size().iter() {
        if !grid.is_walkable(pos) || seen.contains(&pos) {
            continue;
        }
        let mut component = HashSet::from([pos]);
        let mut queue = VecDeque::from([pos]);
        while let Some(current) = queue.pop_front() {
            for next in grid.neighbors(current) {
                if next.is_walkable() && component.insert(next.pos) {
                    queue.push_back(next.pos);
                }
            }
        }
        seen.extend(component.iter().copied());
        found.push(component);
    }
    found
}

/// The tracker must partition walkable tiles exactly like the search does
pub fn assert_matches_search(grid: &TileGrid, islands: &IslandTracker) {
    let expected = components(grid);
    assert_eq!(islands.island_count(), expected.len());

    let mut claimed = HashMap::new();
    for (index, component) in expected.iter().enumerate() {
        let ids: HashSet<_> = component
            .iter()
            .map(|&pos| islands.island_id(pos).unwrap())
            .collect();
        assert_eq!(ids.len(), 1, "component {index} spans several islands");
        let id = ids.into_iter().next().unwrap();
        assert_eq!(claimed.insert(id, index), None, "island {id:?} reused");
        assert_eq!(islands.island(id).map(|i| i.len()), Some(component.len()));
    }
    for pos in grid.size().iter() {
        if !grid.is_walkable(pos) {
            assert_eq!(islands.island_id(pos), None, "blocked tile {pos:?} labelled");
        }
    }
}
