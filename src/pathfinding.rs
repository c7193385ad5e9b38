use bevy::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::config::WorldConfig;
use crate::constants::{ROAD_STEP_COST, TERRAIN_STEP_COST};
use crate::map::grid::TileGrid;
use crate::map::islands::IslandTracker;
use crate::map::tile_pos::TilePos;
use crate::map::tiles::Tile;
use crate::tick::SimulationSet;

pub mod requests;
pub use requests::{PathRequest, PathRequests, PathTicket, advance_path_requests};
pub use crate::messages::PathResolved;

/// Cost of entering a tile. `None` excludes the tile from the search.
///
/// Returned costs must never drop below [`min_step_cost`](PathCost::min_step_cost),
/// otherwise the Manhattan heuristic stops being admissible.
pub trait PathCost {
    fn step_cost(&self, tile: &Tile) -> Option<u32>;

    fn min_step_cost(&self) -> u32 {
        1
    }
}

impl<F> PathCost for F
where
    F: Fn(&Tile) -> Option<u32>,
{
    fn step_cost(&self, tile: &Tile) -> Option<u32> {
        self(tile)
    }
}

/// Built-in cost policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostPolicy {
    /// Resource traffic: roads, bridges and resource nodes are cheap,
    /// bare terrain is expensive
    #[default]
    Logistics,
    /// Every walkable tile costs 1
    Uniform,
}

impl PathCost for CostPolicy {
    fn step_cost(&self, tile: &Tile) -> Option<u32> {
        if !tile.is_walkable() {
            return None;
        }
        match self {
            CostPolicy::Logistics if tile.is_resource_pathable() => Some(ROAD_STEP_COST),
            CostPolicy::Logistics => Some(TERRAIN_STEP_COST),
            CostPolicy::Uniform => Some(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathOptions {
    /// Give up with no path after this many node expansions
    pub max_expansions: Option<usize>,
}

impl PathOptions {
    pub fn bounded(max_expansions: usize) -> Self {
        Self {
            max_expansions: Some(max_expansions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// Frontier not exhausted yet; call `step` again
    Pending,
    /// Tiles after the start up to and including the goal
    Found(Vec<TilePos>),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathfindingNode {
    pub position: TilePos,
    pub cost: u32,
    pub heuristic: u32,
}

impl PathfindingNode {
    pub fn total_cost(&self) -> u32 {
        self.cost.saturating_add(self.heuristic)
    }
}

impl PartialOrd for PathfindingNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathfindingNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties prefer the node further along, then a fixed tile order
        self.total_cost()
            .cmp(&other.total_cost())
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// A* search that can be paused between steps and resumed on a later tick.
/// Each `step` reads the grid as it is at that moment.
#[derive(Debug, Clone)]
pub struct PathSearch<C> {
    start: TilePos,
    goal: TilePos,
    cost: C,
    options: PathOptions,
    open_set: BinaryHeap<Reverse<PathfindingNode>>,
    closed_set: HashSet<TilePos>,
    came_from: HashMap<TilePos, TilePos>,
    cost_so_far: HashMap<TilePos, u32>,
    expansions: usize,
    outcome: Option<SearchStatus>,
}

impl<C: PathCost> PathSearch<C> {
    /// Sets up a search. Obvious outcomes (same tile, blocked goal, different
    /// islands) are decided here without touching the frontier.
    pub fn new(
        grid: &TileGrid,
        islands: Option<&IslandTracker>,
        start: TilePos,
        goal: TilePos,
        cost: C,
        options: PathOptions,
    ) -> Self {
        let mut search = Self {
            start,
            goal,
            cost,
            options,
            open_set: BinaryHeap::new(),
            closed_set: HashSet::new(),
            came_from: HashMap::new(),
            cost_so_far: HashMap::new(),
            expansions: 0,
            outcome: None,
        };

        let goal_enterable = grid
            .get_tile(goal)
            .is_some_and(|tile| search.cost.step_cost(tile).is_some());
        if grid.get_tile(start).is_none() || !goal_enterable {
            search.outcome = Some(SearchStatus::NotFound);
        } else if start == goal {
            search.outcome = Some(SearchStatus::Found(Vec::new()));
        } else if let Some(islands) = islands
            && let (Some(a), Some(b)) = (islands.island_id(start), islands.island_id(goal))
            && a != b
        {
            search.outcome = Some(SearchStatus::NotFound);
        } else {
            search.open_set.push(Reverse(PathfindingNode {
                position: start,
                cost: 0,
                heuristic: search.heuristic(start),
            }));
            search.cost_so_far.insert(start, 0);
        }
        search
    }

    pub fn start(&self) -> TilePos {
        self.start
    }

    pub fn goal(&self) -> TilePos {
        self.goal
    }

    pub fn expansions(&self) -> usize {
        self.expansions
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Expand at most `budget` nodes
    pub fn step(&mut self, grid: &TileGrid, budget: usize) -> SearchStatus {
        let mut remaining = budget;
        while self.outcome.is_none() && remaining > 0 {
            let Some(Reverse(current)) = self.open_set.pop() else {
                self.outcome = Some(SearchStatus::NotFound);
                break;
            };
            if current.position == self.goal {
                self.outcome = Some(SearchStatus::Found(self.reconstruct_path()));
                break;
            }
            if !self.closed_set.insert(current.position) {
                continue;
            }
            if self
                .options
                .max_expansions
                .is_some_and(|max| self.expansions >= max)
            {
                self.outcome = Some(SearchStatus::NotFound);
                break;
            }
            self.expansions += 1;
            remaining -= 1;

            for neighbor in grid.neighbors(current.position) {
                if self.closed_set.contains(&neighbor.pos) {
                    continue;
                }
                let Some(step) = self.cost.step_cost(neighbor) else {
                    continue;
                };
                let tentative = current.cost.saturating_add(step);
                if self
                    .cost_so_far
                    .get(&neighbor.pos)
                    .is_some_and(|&existing| tentative >= existing)
                {
                    continue;
                }
                self.cost_so_far.insert(neighbor.pos, tentative);
                self.came_from.insert(neighbor.pos, current.position);
                self.open_set.push(Reverse(PathfindingNode {
                    position: neighbor.pos,
                    cost: tentative,
                    heuristic: self.heuristic(neighbor.pos),
                }));
            }
        }
        self.outcome.clone().unwrap_or(SearchStatus::Pending)
    }

    /// Run to completion
    pub fn run(&mut self, grid: &TileGrid) -> Option<Vec<TilePos>> {
        match self.step(grid, usize::MAX) {
            SearchStatus::Found(path) => Some(path),
            SearchStatus::Pending | SearchStatus::NotFound => None,
        }
    }

    fn heuristic(&self, pos: TilePos) -> u32 {
        pos.manhattan(self.goal)
            .saturating_mul(self.cost.min_step_cost())
    }

    fn reconstruct_path(&self) -> Vec<TilePos> {
        let mut path = vec![self.goal];
        let mut current = self.goal;
        while let Some(&previous) = self.came_from.get(&current) {
            if previous == self.start {
                break;
            }
            path.push(previous);
            current = previous;
        }
        path.reverse();
        path
    }
}

/// Weighted shortest path from `start` to `goal`, excluding `start`.
///
/// Passing the island tracker rejects endpoints on different islands without
/// searching; leave it out when `cost` admits tiles the tracker treats as blocked.
/// Running out of `options.max_expansions` yields `None`, same as no path.
pub fn find_path<C: PathCost>(
    grid: &TileGrid,
    islands: Option<&IslandTracker>,
    start: TilePos,
    goal: TilePos,
    cost: C,
    options: PathOptions,
) -> Option<Vec<TilePos>> {
    PathSearch::new(grid, islands, start, goal, cost, options).run(grid)
}

/// Total cost of walking `path` from `start`, or `None` if a step is not allowed
pub fn path_cost<C: PathCost>(
    grid: &TileGrid,
    start: TilePos,
    path: &[TilePos],
    cost: &C,
) -> Option<u32> {
    let mut previous = start;
    let mut total = 0;
    for &pos in path {
        if !previous.is_adjacent(pos) {
            return None;
        }
        total = cost.step_cost(grid.get_tile(pos)?)?.saturating_add(total);
        previous = pos;
    }
    Some(total)
}

/// Runs pending path requests in bounded slices each tick
pub struct PathfindingPlugin;

impl Plugin for PathfindingPlugin {
    fn build(&self, app: &mut App) {
        let requests = app
            .world()
            .get_resource::<WorldConfig>()
            .map(PathRequests::from_config)
            .unwrap_or_default();
        app.insert_resource(requests)
            .add_message::<PathResolved>()
            .add_systems(
                Update,
                advance_path_requests.in_set(SimulationSet::Paths),
            );
    }
}
