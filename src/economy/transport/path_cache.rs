//! Cached routes from every resource node and market to the home base.
//!
//! Routes are invalidated by grid edits (through [`GridObserver`]) and
//! recomputed lazily once per tick by [`PathCache::recompute_stale`].

use bevy::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::map::buildings::BuildingKind;
use crate::map::grid::{ChangeKind, GridObserver, TileChange, TileGrid};
use crate::map::islands::IslandTracker;
use crate::map::tile_pos::{ChunkPos, TilePos};
use crate::map::tiles::Tile;
use crate::pathfinding::{CostPolicy, PathCost, PathOptions, find_path, path_cost};

/// What sits at the cached end of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteEndpoint {
    ResourceNode,
    Market,
}

impl RouteEndpoint {
    pub fn of(tile: &Tile) -> Option<Self> {
        if tile.resource.is_some() {
            Some(RouteEndpoint::ResourceNode)
        } else if tile.building.as_ref().is_some_and(|b| b.market.is_some()) {
            Some(RouteEndpoint::Market)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRoute {
    pub endpoint: RouteEndpoint,
    /// From the node (excluded) to the home base (included)
    pub path: Option<Vec<TilePos>>,
    /// Logistics cost of `path` when it was computed
    pub cost: Option<u32>,
    pub stale: bool,
    /// Path exists and every tile on it was traversable when it was computed
    pub available: bool,
}

impl CachedRoute {
    fn new(endpoint: RouteEndpoint) -> Self {
        Self {
            endpoint,
            path: None,
            cost: None,
            stale: true,
            available: false,
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct PathCache {
    home_base: Option<TilePos>,
    routes: BTreeMap<TilePos, CachedRoute>,
    /// Tile -> nodes whose cached path crosses it
    crossing: HashMap<TilePos, HashSet<TilePos>>,
}

impl PathCache {
    /// Cache with every endpoint on `grid` registered and stale
    pub fn from_grid(grid: &TileGrid) -> Self {
        let mut cache = Self::default();
        cache.rebuild(grid);
        cache
    }

    /// Forget everything and re-register endpoints from the grid
    pub fn rebuild(&mut self, grid: &TileGrid) {
        self.routes.clear();
        self.crossing.clear();
        self.home_base = grid.home_base();
        for tile in grid.tiles() {
            if let Some(endpoint) = RouteEndpoint::of(tile) {
                self.routes.insert(tile.pos, CachedRoute::new(endpoint));
            }
        }
        info!(
            "Path cache tracking {} routes to home base {:?}",
            self.routes.len(),
            self.home_base
        );
    }

    pub fn home_base(&self) -> Option<TilePos> {
        self.home_base
    }

    /// Start tracking `node`; its route starts out stale
    pub fn register(&mut self, node: TilePos, endpoint: RouteEndpoint) {
        self.unregister(node);
        self.routes.insert(node, CachedRoute::new(endpoint));
    }

    pub fn unregister(&mut self, node: TilePos) -> Option<CachedRoute> {
        let route = self.routes.remove(&node)?;
        self.forget_crossings(node, route.path.as_deref());
        Some(route)
    }

    pub fn route(&self, node: TilePos) -> Option<&CachedRoute> {
        self.routes.get(&node)
    }

    pub fn routes(&self) -> impl Iterator<Item = (TilePos, &CachedRoute)> {
        self.routes.iter().map(|(pos, route)| (*pos, route))
    }

    pub fn path(&self, node: TilePos) -> Option<&[TilePos]> {
        self.routes.get(&node)?.path.as_deref()
    }

    /// What the economy layer checks before harvesting or selling
    pub fn path_available(&self, node: TilePos) -> bool {
        self.routes.get(&node).is_some_and(|r| r.available)
    }

    pub fn is_stale(&self, node: TilePos) -> bool {
        self.routes.get(&node).is_some_and(|r| r.stale)
    }

    /// Fresh and known to have no usable route
    pub fn is_blocked(&self, node: TilePos) -> bool {
        self.routes
            .get(&node)
            .is_some_and(|r| !r.stale && !r.available)
    }

    pub fn stale_count(&self) -> usize {
        self.routes.values().filter(|r| r.stale).count()
    }

    /// Route from the home base out to `node`: excludes the base, ends at `node`
    pub fn outbound_path(&self, node: TilePos) -> Option<Vec<TilePos>> {
        let path = self.path(node)?;
        let mut outbound: Vec<TilePos> = path.iter().rev().skip(1).copied().collect();
        outbound.push(node);
        Some(outbound)
    }

    /// Mark stale every route that starts at, ends at or passes through `pos`.
    /// Returns how many routes went from fresh to stale.
    pub fn invalidate_near(&mut self, pos: TilePos) -> usize {
        let mut nodes: Vec<TilePos> = self
            .crossing
            .get(&pos)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        if self.routes.contains_key(&pos) {
            nodes.push(pos);
        }
        nodes
            .into_iter()
            .filter(|node| self.mark_stale(*node))
            .count()
    }

    pub fn invalidate_all(&mut self) -> usize {
        let nodes: Vec<TilePos> = self.routes.keys().copied().collect();
        nodes.into_iter().filter(|n| self.mark_stale(*n)).count()
    }

    /// Routes with no path may have gained one after a tile opened up
    pub fn invalidate_unrouted(&mut self) -> usize {
        let mut count = 0;
        for route in self.routes.values_mut() {
            if route.path.is_none() && !route.stale {
                route.stale = true;
                count += 1;
            }
        }
        count
    }

    /// Mark stale every fresh route that a cheaper step at `pos` could shorten.
    /// Any path through `pos` costs at least its Manhattan length via `pos`, so
    /// routes already at or under that bound keep their path.
    pub fn invalidate_shortcuts(&mut self, pos: TilePos) -> usize {
        let Some(home) = self.home_base else {
            return 0;
        };
        let min_step = CostPolicy::Logistics.min_step_cost();
        let nodes: Vec<TilePos> = self
            .routes
            .iter()
            .filter(|(node, route)| {
                !route.stale
                    && route.cost.is_some_and(|cost| {
                        (node.manhattan(pos) + pos.manhattan(home)).saturating_mul(min_step) < cost
                    })
            })
            .map(|(node, _)| *node)
            .collect();
        nodes.into_iter().filter(|n| self.mark_stale(*n)).count()
    }

    /// Re-run the pathfinder for every stale route. Returns how many were recomputed.
    pub fn recompute_stale(&mut self, grid: &TileGrid, islands: &IslandTracker) -> usize {
        let stale: Vec<TilePos> = self
            .routes
            .iter()
            .filter(|(_, r)| r.stale)
            .map(|(pos, _)| *pos)
            .collect();
        for &node in &stale {
            let path = self.home_base.and_then(|home| {
                find_path(
                    grid,
                    Some(islands),
                    node,
                    home,
                    CostPolicy::Logistics,
                    PathOptions::default(),
                )
            });
            self.store(grid, node, path);
        }
        if !stale.is_empty() {
            debug!("Recomputed {} cached routes", stale.len());
        }
        stale.len()
    }

    fn store(&mut self, grid: &TileGrid, node: TilePos, path: Option<Vec<TilePos>>) {
        let Some(old) = self.routes.get(&node).map(|r| r.path.clone()) else {
            return;
        };
        self.forget_crossings(node, old.as_deref());
        if let Some(path) = &path {
            for &pos in path {
                self.crossing.entry(pos).or_default().insert(node);
            }
        }
        let available = path
            .as_ref()
            .is_some_and(|p| !p.is_empty() && p.iter().all(|&t| grid.is_walkable(t)));
        let cost = path
            .as_deref()
            .and_then(|p| path_cost(grid, node, p, &CostPolicy::Logistics));
        if let Some(route) = self.routes.get_mut(&node) {
            route.path = path;
            route.cost = cost;
            route.available = available;
            route.stale = false;
        }
    }

    fn mark_stale(&mut self, node: TilePos) -> bool {
        match self.routes.get_mut(&node) {
            Some(route) if !route.stale => {
                route.stale = true;
                true
            }
            _ => false,
        }
    }

    fn forget_crossings(&mut self, node: TilePos, path: Option<&[TilePos]>) {
        for pos in path.unwrap_or_default() {
            if let Some(set) = self.crossing.get_mut(pos) {
                set.remove(&node);
                if set.is_empty() {
                    self.crossing.remove(pos);
                }
            }
        }
    }

    /// Register, re-register or drop the endpoint at `pos` to match the tile
    fn sync_endpoint(&mut self, grid: &TileGrid, pos: TilePos) {
        let wanted = grid.get_tile(pos).and_then(RouteEndpoint::of);
        let current = self.routes.get(&pos).map(|r| r.endpoint);
        match (current, wanted) {
            (Some(a), Some(b)) if a == b => {}
            (_, Some(endpoint)) => self.register(pos, endpoint),
            (Some(_), None) => {
                self.unregister(pos);
            }
            (None, None) => {}
        }
    }
}

impl GridObserver for PathCache {
    fn on_tile_changed(&mut self, grid: &TileGrid, change: &TileChange) {
        match change.kind {
            ChangeKind::BuildingPlaced(BuildingKind::HomeBase) => {
                self.home_base = Some(change.pos);
                self.invalidate_all();
            }
            ChangeKind::BuildingRemoved {
                kind: BuildingKind::HomeBase,
                ..
            } => {
                self.home_base = None;
                self.invalidate_all();
            }
            _ => {}
        }
        self.sync_endpoint(grid, change.pos);
        self.invalidate_near(change.pos);
        if change.became_passable() {
            self.invalidate_unrouted();
        }
        // Opened or cheapened tiles can shorten routes that never touched them
        let cheap_now = grid
            .get_tile(change.pos)
            .is_some_and(Tile::is_resource_pathable);
        if change.is_walkable && (change.became_passable() || cheap_now) {
            self.invalidate_shortcuts(change.pos);
        }
    }

    fn on_chunk_generated(&mut self, grid: &TileGrid, chunk: ChunkPos) {
        let Some(chunk) = grid.chunk(chunk) else {
            return;
        };
        for pos in chunk.tile_positions() {
            self.sync_endpoint(grid, pos);
        }
        self.invalidate_unrouted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(rows: &[&str]) -> (TileGrid, IslandTracker, PathCache) {
        let grid = TileGrid::from_ascii(rows).unwrap();
        let islands = IslandTracker::from_grid(&grid);
        let mut cache = PathCache::from_grid(&grid);
        cache.recompute_stale(&grid, &islands);
        (grid, islands, cache)
    }

    #[test]
    fn registers_nodes_and_markets() {
        let (_, _, cache) = fresh(&["r.M", "..H"]);
        assert_eq!(
            cache.route(TilePos::new(0, 0)).map(|r| r.endpoint),
            Some(RouteEndpoint::ResourceNode)
        );
        assert_eq!(
            cache.route(TilePos::new(2, 0)).map(|r| r.endpoint),
            Some(RouteEndpoint::Market)
        );
        assert_eq!(cache.home_base(), Some(TilePos::new(2, 1)));
        assert_eq!(cache.stale_count(), 0);
        assert!(cache.path_available(TilePos::new(2, 0)));
    }

    #[test]
    fn invalidation_only_touches_crossing_routes() {
        let (_, _, mut cache) = fresh(&["r...H", "~~~~.", "r...."]);
        let top = TilePos::new(0, 0);
        let bottom = TilePos::new(0, 2);
        let on_top_path = cache.path(top).unwrap()[1];
        let bottom_path = cache.path(bottom).unwrap().to_vec();
        assert!(!bottom_path.contains(&on_top_path));

        assert_eq!(cache.invalidate_near(on_top_path), 1);
        assert!(cache.is_stale(top));
        assert!(!cache.is_stale(bottom));
        // Touching the home base hits every route
        cache.invalidate_near(TilePos::new(4, 0));
        assert!(cache.is_stale(bottom));
    }

    #[test]
    fn outbound_path_runs_from_base_to_market() {
        let (_, _, cache) = fresh(&["M..H"]);
        let market = TilePos::new(0, 0);
        assert_eq!(
            cache.path(market).unwrap(),
            &[TilePos::new(1, 0), TilePos::new(2, 0), TilePos::new(3, 0)]
        );
        assert_eq!(
            cache.outbound_path(market).unwrap(),
            vec![TilePos::new(2, 0), TilePos::new(1, 0), market]
        );
    }

    #[test]
    fn missing_home_base_means_no_route() {
        let (_, _, cache) = fresh(&["r..."]);
        assert!(cache.is_blocked(TilePos::new(0, 0)));
        assert!(!cache.path_available(TilePos::new(0, 0)));
    }

    #[test]
    fn new_bridge_reopens_unrouted_nodes() {
        let (mut grid, mut islands, mut cache) = fresh(&["r~H"]);
        let node = TilePos::new(0, 0);
        assert!(cache.is_blocked(node));

        grid.set_building(
            TilePos::new(1, 0),
            BuildingKind::Bridge,
            &mut [&mut islands, &mut cache],
        )
        .unwrap();
        assert!(cache.is_stale(node));
        cache.recompute_stale(&grid, &islands);
        assert!(cache.path_available(node));
        assert_eq!(cache.path(node).unwrap().len(), 2);
    }

    #[test]
    fn cleared_resources_stop_being_tracked() {
        let (mut grid, mut islands, mut cache) = fresh(&["r.H"]);
        let node = TilePos::new(0, 0);
        grid.clear_resource(node, &mut [&mut islands, &mut cache])
            .unwrap();
        assert!(cache.route(node).is_none());

        grid.set_building(node, BuildingKind::Farm, &mut [&mut islands, &mut cache])
            .unwrap();
        assert!(cache.is_stale(node));
    }

    #[test]
    fn removed_wall_lets_a_detour_shrink_back() {
        let (mut grid, mut islands, mut cache) = fresh(&["r...H", "....."]);
        let node = TilePos::new(0, 0);
        let wall = TilePos::new(2, 0);
        assert_eq!(cache.route(node).and_then(|r| r.cost), Some(16));

        grid.set_building(wall, BuildingKind::Wall, &mut [&mut islands, &mut cache])
            .unwrap();
        cache.recompute_stale(&grid, &islands);
        assert_eq!(cache.route(node).and_then(|r| r.cost), Some(26));
        assert!(!cache.path(node).unwrap().contains(&wall));

        grid.clear_building(wall, &mut [&mut islands, &mut cache])
            .unwrap();
        assert!(cache.is_stale(node));
        cache.recompute_stale(&grid, &islands);
        assert_eq!(cache.route(node).and_then(|r| r.cost), Some(16));
        assert_eq!(cache.path(node).map(<[TilePos]>::len), Some(4));
    }

    #[test]
    fn roads_beside_a_route_pull_it_over() {
        let (mut grid, mut islands, mut cache) = fresh(&["r...H", "....."]);
        let node = TilePos::new(0, 0);
        for x in 1..5 {
            grid.set_building(
                TilePos::new(x, 1),
                BuildingKind::Road,
                &mut [&mut islands, &mut cache],
            )
            .unwrap();
            assert!(cache.is_stale(node), "road at x={x}");
            cache.recompute_stale(&grid, &islands);
        }
        // Down onto the road, along it, then up into the home base
        assert_eq!(cache.route(node).and_then(|r| r.cost), Some(10));
        assert!(cache.path(node).unwrap().contains(&TilePos::new(2, 1)));
    }

    #[test]
    fn far_away_roads_leave_cheap_routes_alone() {
        let (mut grid, mut islands, mut cache) = fresh(&["r+H", "...", "...", "..."]);
        let node = TilePos::new(0, 0);
        assert_eq!(cache.route(node).and_then(|r| r.cost), Some(2));
        grid.set_building(
            TilePos::new(1, 3),
            BuildingKind::Road,
            &mut [&mut islands, &mut cache],
        )
        .unwrap();
        assert!(!cache.is_stale(node));
    }

    #[test]
    fn moving_home_base_invalidates_everything() {
        let (mut grid, mut islands, mut cache) = fresh(&["r.M.."]);
        grid.set_building(
            TilePos::new(4, 0),
            BuildingKind::HomeBase,
            &mut [&mut islands, &mut cache],
        )
        .unwrap();
        assert_eq!(cache.home_base(), Some(TilePos::new(4, 0)));
        assert_eq!(cache.stale_count(), 2);
        cache.recompute_stale(&grid, &islands);
        assert!(cache.path_available(TilePos::new(0, 0)));
    }
}
