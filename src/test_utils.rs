//! Testing utilities for the tile logistics core
//!
//! Brute-force oracles used to cross-check the incremental structures, plus a
//! few helpers for driving message-based systems in isolation.

use bevy::ecs::message::{Message, MessageReader};
use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::{HashSet, VecDeque};

use crate::map::grid::TileGrid;
use crate::map::tile_pos::TilePos;
use crate::pathfinding::PathCost;

/// Tiles reachable from `start` over walkable tiles, including `start`
pub fn reachable_from(grid: &TileGrid, start: TilePos) -> HashSet<TilePos> {
    if !grid.is_walkable(start) {
        return HashSet::new();
    }
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in grid.neighbors(current) {
            if next.is_walkable() && seen.insert(next.pos) {
                queue.push_back(next.pos);
            }
        }
    }
    seen
}

/// Unweighted shortest distance over walkable tiles
pub fn bfs_distance(grid: &TileGrid, start: TilePos, goal: TilePos) -> Option<usize> {
    if !grid.is_walkable(goal) || grid.get_tile(start).is_none() {
        return None;
    }
    let mut dist = std::collections::HashMap::from([(start, 0usize)]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let d = dist[&current];
        if current == goal {
            return Some(d);
        }
        for next in grid.neighbors(current) {
            if next.is_walkable() && !dist.contains_key(&next.pos) {
                dist.insert(next.pos, d + 1);
                queue.push_back(next.pos);
            }
        }
    }
    None
}

/// Cheapest cost over every simple path; only for tiny grids
pub fn exhaustive_min_cost<C: PathCost>(
    grid: &TileGrid,
    start: TilePos,
    goal: TilePos,
    cost: &C,
) -> Option<u32> {
    fn walk<C: PathCost>(
        grid: &TileGrid,
        current: TilePos,
        goal: TilePos,
        cost: &C,
        spent: u32,
        visited: &mut HashSet<TilePos>,
        best: &mut Option<u32>,
    ) {
        if best.is_some_and(|b| spent >= b) && current != goal {
            return;
        }
        if current == goal {
            *best = Some(best.map_or(spent, |b| b.min(spent)));
            return;
        }
        for next in grid.neighbors(current) {
            if visited.contains(&next.pos) {
                continue;
            }
            let Some(step) = cost.step_cost(next) else {
                continue;
            };
            visited.insert(next.pos);
            walk(grid, next.pos, goal, cost, spent + step, visited, best);
            visited.remove(&next.pos);
        }
    }

    let mut best = None;
    let mut visited = HashSet::from([start]);
    walk(grid, start, goal, cost, 0, &mut visited, &mut best);
    best
}

/// Checks a path excludes `start`, moves one cardinal step at a time and ends at `goal`
pub fn assert_valid_path(start: TilePos, goal: TilePos, path: &[TilePos]) {
    let mut previous = start;
    for &pos in path {
        assert!(
            previous.is_adjacent(pos),
            "{previous:?} -> {pos:?} is not a cardinal step"
        );
        previous = pos;
    }
    assert_eq!(previous, goal, "path does not end at the goal");
}

/// Random rows of land and water for property tests
pub fn random_rows(rng: &mut StdRng, width: usize, height: usize, water: f64) -> Vec<String> {
    (0..height)
        .map(|_| {
            (0..width)
                .map(|_| if rng.random_bool(water) { '~' } else { '.' })
                .collect()
        })
        .collect()
}

pub fn grid_from_rows(rows: &[String]) -> TileGrid {
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    TileGrid::from_ascii(&rows).unwrap()
}

/// Read every queued message of type `M`
pub fn drain_messages<M: Message + Clone>(world: &mut World) -> Vec<M> {
    let mut state: SystemState<MessageReader<M>> = SystemState::new(world);
    let mut reader = state.get_mut(world);
    let messages = reader.read().cloned().collect();
    state.apply(world);
    messages
}
