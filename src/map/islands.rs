//! Connected components ("islands") of traversable tiles.
//!
//! The full sweep runs once after world generation. Afterwards the tracker is
//! kept current by the [`GridObserver`] hooks: a blocking edit re-floods only
//! the island that lost the tile, an enabling edit merges neighbouring islands
//! into the lowest id.

use bevy::prelude::*;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

use crate::map::grid::{GridObserver, TileChange, TileGrid};
use crate::map::tile_pos::{ChunkPos, MapSize, TilePos};

/// Island identifier. Ids are handed out in increasing order and never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IslandId(pub u32);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Island {
    pub id: IslandId,
    pub tiles: HashSet<TilePos>,
}

impl Island {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }
}

/// Raised by [`IslandTracker::validate`] when derived state disagrees with the grid.
/// Only reachable if tile occupancy was changed behind the tracker's back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InconsistentIslandState {
    #[error("tracker sized for {tracker:?}, grid is {grid:?}")]
    SizeMismatch { tracker: MapSize, grid: MapSize },
    #[error("traversable tile {0:?} has no island")]
    Unlabelled(TilePos),
    #[error("impassable tile {0:?} is labelled {1:?}")]
    LabelledImpassable(TilePos, IslandId),
    #[error("tile {pos:?} labelled {label:?} is missing from that island")]
    MembershipMismatch { pos: TilePos, label: IslandId },
    #[error("adjacent tiles {a:?} and {b:?} are on different islands")]
    SplitNeighbours { a: TilePos, b: TilePos },
    #[error("island {0:?} is not connected")]
    Disconnected(IslandId),
}

#[derive(Resource, Debug, Clone, Default)]
pub struct IslandTracker {
    size: MapSize,
    /// Island of each tile, row-major
    labels: Vec<Option<IslandId>>,
    /// Indexed by id; emptied islands stay as reserved records
    islands: Vec<Island>,
}

impl IslandTracker {
    pub fn new(size: MapSize) -> Self {
        Self {
            size,
            labels: vec![None; size.count()],
            islands: Vec::new(),
        }
    }

    /// Tracker with a completed full sweep of `grid`
    pub fn from_grid(grid: &TileGrid) -> Self {
        let mut tracker = Self::new(grid.size());
        tracker.process_islands(grid, None);
        tracker
    }

    /// `None` runs the full sweep and restarts id allocation. `Some(seed)` re-floods
    /// only the component containing `seed` under a fresh id.
    /// Returns the number of islands created.
    pub fn process_islands(&mut self, grid: &TileGrid, seed: Option<TilePos>) -> usize {
        match seed {
            None => self.full_sweep(grid),
            Some(seed) => self.resweep_from(grid, seed),
        }
    }

    fn full_sweep(&mut self, grid: &TileGrid) -> usize {
        self.size = grid.size();
        self.labels = vec![None; self.size.count()];
        self.islands.clear();

        for pos in self.size.iter() {
            if self.label(pos).is_some() || !grid.is_walkable(pos) {
                continue;
            }
            let id = self.allocate();
            let tiles = flood(grid, pos, |_| true);
            self.assign(id, tiles);
        }
        info!(
            "Island sweep found {} islands on a {}x{} map",
            self.islands.len(),
            self.size.x,
            self.size.y
        );
        self.islands.len()
    }

    fn resweep_from(&mut self, grid: &TileGrid, seed: TilePos) -> usize {
        if self.size != grid.size() {
            return self.full_sweep(grid);
        }
        if !grid.is_walkable(seed) {
            self.unlabel(seed);
            return 0;
        }
        let tiles = flood(grid, seed, |_| true);
        for &pos in &tiles {
            self.unlabel(pos);
        }
        let id = self.allocate();
        self.assign(id, tiles);
        1
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn island_id(&self, pos: TilePos) -> Option<IslandId> {
        self.label(pos)
    }

    /// True only when both tiles are traversable and share an island
    pub fn is_same_island(&self, a: TilePos, b: TilePos) -> bool {
        match (self.label(a), self.label(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn island(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(id.0 as usize)
    }

    /// Non-empty islands
    pub fn islands(&self) -> impl Iterator<Item = &Island> {
        self.islands.iter().filter(|island| !island.is_empty())
    }

    pub fn island_count(&self) -> usize {
        self.islands().count()
    }

    /// Ids handed out so far, including reserved empty records
    pub fn allocated_ids(&self) -> usize {
        self.islands.len()
    }

    /// A traversal-blocking edit removed `pos` from its island
    pub fn on_tile_becomes_impassable(&mut self, grid: &TileGrid, pos: TilePos) {
        let Some(old) = self.unlabel(pos) else {
            return;
        };
        let mut starts: Vec<TilePos> = pos
            .cardinal_neighbors(self.size)
            .filter(|&n| self.label(n) == Some(old))
            .collect();
        if starts.len() < 2 {
            return;
        }

        // Flood from the first neighbour; stop as soon as every other one is reached
        let first = starts.remove(0);
        let mut pending: HashSet<TilePos> = starts.iter().copied().collect();
        let mut seen = HashSet::from([first]);
        let mut queue = VecDeque::from([first]);
        while let Some(current) = queue.pop_front() {
            pending.remove(&current);
            if pending.is_empty() {
                return;
            }
            for next in current.cardinal_neighbors(self.size) {
                if self.label(next) == Some(old) && grid.is_walkable(next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        // The first fill ran to completion without meeting everyone: split
        let mut pieces = vec![seen];
        for start in starts {
            if pieces.iter().any(|piece| piece.contains(&start)) {
                continue;
            }
            pieces.push(flood(grid, start, |p| self.label(p) == Some(old)));
        }
        self.islands[old.0 as usize].tiles.clear();
        let mut created = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let id = self.allocate();
            self.assign(id, piece);
            created.push(id);
        }
        debug!(
            "Blocking {:?} split island {:?} into {:?}",
            pos, old, created
        );
    }

    /// A traversal-enabling edit added `pos`; neighbours merge into the lowest id
    pub fn on_tile_becomes_passable(&mut self, grid: &TileGrid, pos: TilePos) {
        if self.size.index(pos).is_none() || self.label(pos).is_some() {
            return;
        }
        let mut neighbours: Vec<IslandId> = pos
            .cardinal_neighbors(self.size)
            .filter(|&n| grid.is_walkable(n))
            .filter_map(|n| self.label(n))
            .collect();
        neighbours.sort();
        neighbours.dedup();

        let Some((&target, others)) = neighbours.split_first() else {
            let id = self.allocate();
            self.assign(id, HashSet::from([pos]));
            return;
        };
        for &other in others {
            let moved = std::mem::take(&mut self.islands[other.0 as usize].tiles);
            self.assign(target, moved);
        }
        if !others.is_empty() {
            debug!("Opening {:?} merged {:?} into {:?}", pos, others, target);
        }
        self.assign(target, HashSet::from([pos]));
    }

    /// Check every invariant against the grid
    pub fn validate(&self, grid: &TileGrid) -> Result<(), InconsistentIslandState> {
        if self.size != grid.size() {
            return Err(InconsistentIslandState::SizeMismatch {
                tracker: self.size,
                grid: grid.size(),
            });
        }
        for pos in self.size.iter() {
            match (grid.is_walkable(pos), self.label(pos)) {
                (true, None) => return Err(InconsistentIslandState::Unlabelled(pos)),
                (false, Some(label)) => {
                    return Err(InconsistentIslandState::LabelledImpassable(pos, label));
                }
                (true, Some(label)) => {
                    let member = self
                        .island(label)
                        .is_some_and(|island| island.tiles.contains(&pos));
                    if !member {
                        return Err(InconsistentIslandState::MembershipMismatch { pos, label });
                    }
                    for n in pos.cardinal_neighbors(self.size) {
                        if grid.is_walkable(n) && self.label(n) != Some(label) {
                            return Err(InconsistentIslandState::SplitNeighbours { a: pos, b: n });
                        }
                    }
                }
                (false, None) => {}
            }
        }
        for island in self.islands() {
            for &pos in &island.tiles {
                if self.label(pos) != Some(island.id) {
                    return Err(InconsistentIslandState::MembershipMismatch {
                        pos,
                        label: island.id,
                    });
                }
            }
            let Some(&start) = island.tiles.iter().next() else {
                continue;
            };
            if flood(grid, start, |_| true).len() != island.len() {
                return Err(InconsistentIslandState::Disconnected(island.id));
            }
        }
        Ok(())
    }

    /// Panics when [`validate`](Self::validate) fails
    pub fn assert_consistent(&self, grid: &TileGrid) {
        if let Err(err) = self.validate(grid) {
            panic!("island tracker out of sync with grid: {err}");
        }
    }

    fn label(&self, pos: TilePos) -> Option<IslandId> {
        self.size.index(pos).and_then(|i| self.labels[i])
    }

    fn allocate(&mut self) -> IslandId {
        let id = IslandId(self.islands.len() as u32);
        self.islands.push(Island {
            id,
            tiles: HashSet::new(),
        });
        id
    }

    fn assign(&mut self, id: IslandId, tiles: HashSet<TilePos>) {
        for &pos in &tiles {
            if let Some(i) = self.size.index(pos) {
                self.labels[i] = Some(id);
            }
        }
        self.islands[id.0 as usize].tiles.extend(tiles);
    }

    /// Drop a tile from its island; returns the island it belonged to
    fn unlabel(&mut self, pos: TilePos) -> Option<IslandId> {
        let i = self.size.index(pos)?;
        let old = self.labels[i].take()?;
        self.islands[old.0 as usize].tiles.remove(&pos);
        Some(old)
    }
}

/// BFS over traversable tiles from `start`, restricted by `allow`
fn flood(grid: &TileGrid, start: TilePos, allow: impl Fn(TilePos) -> bool) -> HashSet<TilePos> {
    let size = grid.size();
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in current.cardinal_neighbors(size) {
            if grid.is_walkable(next) && allow(next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

impl GridObserver for IslandTracker {
    fn on_tile_changed(&mut self, grid: &TileGrid, change: &TileChange) {
        if change.became_impassable() {
            self.on_tile_becomes_impassable(grid, change.pos);
        } else if change.became_passable() {
            self.on_tile_becomes_passable(grid, change.pos);
        }
    }

    fn on_chunk_generated(&mut self, grid: &TileGrid, chunk: ChunkPos) {
        if self.size != grid.size() {
            self.full_sweep(grid);
            return;
        }
        let Some(chunk) = grid.chunk(chunk) else {
            return;
        };
        for pos in chunk.tile_positions() {
            if grid.is_walkable(pos) {
                self.on_tile_becomes_passable(grid, pos);
            }
        }
    }
}
