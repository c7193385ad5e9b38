use serde::{Deserialize, Serialize};

/// Integer tile coordinates. `(0, 0)` is the top-left tile of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl TilePos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance, the admissible heuristic on a 4-connected grid
    pub fn manhattan(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn is_adjacent(self, other: TilePos) -> bool {
        self.manhattan(other) == 1
    }

    /// Up to four cardinal neighbours, clipped at the map bounds
    pub fn cardinal_neighbors(self, size: MapSize) -> impl Iterator<Item = TilePos> {
        const OFFSETS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
        OFFSETS.into_iter().filter_map(move |(dx, dy)| {
            let x = self.x as i64 + dx;
            let y = self.y as i64 + dy;
            (x >= 0 && y >= 0 && x < size.x as i64 && y < size.y as i64)
                .then(|| TilePos::new(x as u32, y as u32))
        })
    }

    pub fn chunk(self, chunk_size: u32) -> ChunkPos {
        ChunkPos {
            x: self.x / chunk_size,
            y: self.y / chunk_size,
        }
    }
}

impl From<(u32, u32)> for TilePos {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// Chunk coordinates (tile coordinates divided by the chunk size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: u32,
    pub y: u32,
}

impl ChunkPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn origin(self, chunk_size: u32) -> TilePos {
        TilePos::new(self.x * chunk_size, self.y * chunk_size)
    }
}

/// Map dimensions in tiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapSize {
    pub x: u32,
    pub y: u32,
}

impl MapSize {
    pub fn contains(self, pos: TilePos) -> bool {
        pos.x < self.x && pos.y < self.y
    }

    pub fn count(self) -> usize {
        self.x as usize * self.y as usize
    }

    /// Row-major flat index used by derived per-tile tables
    pub fn index(self, pos: TilePos) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.y as usize * self.x as usize + pos.x as usize)
    }

    pub fn pos_at(self, index: usize) -> TilePos {
        TilePos::new(
            (index % self.x as usize) as u32,
            (index / self.x as usize) as u32,
        )
    }

    pub fn center(self) -> TilePos {
        TilePos::new(self.x / 2, self.y / 2)
    }

    pub fn iter(self) -> impl Iterator<Item = TilePos> {
        (0..self.y).flat_map(move |y| (0..self.x).map(move |x| TilePos::new(x, y)))
    }
}
