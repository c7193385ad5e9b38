use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::map::buildings::BuildingKind;
use crate::map::tile_pos::TilePos;
use crate::resources::ResourceType;

/// Terrain classes produced by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainType {
    Water,
    #[default]
    Land,
    Highland, // Rare sliver at the top of the height range
}

impl TerrainType {
    pub fn is_water(self) -> bool {
        self == TerrainType::Water
    }

    pub fn ascii(self) -> char {
        match self {
            TerrainType::Water => '~',
            TerrainType::Land => '.',
            TerrainType::Highland => '^',
        }
    }
}

/// A harvestable spawn point
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub resource: ResourceType,
    /// Harvests left before depletion
    pub durability: u32,
}

impl ResourceNode {
    pub fn new(resource: ResourceType) -> Self {
        Self {
            resource,
            durability: resource.def().durability,
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.durability == 0
    }
}

/// Sale bookkeeping carried by market buildings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketState {
    pub sold: BTreeMap<ResourceType, u32>,
    pub revenue: u64,
}

impl MarketState {
    pub fn record_sale(&mut self, resource: ResourceType, quantity: u32, revenue: u64) {
        *self.sold.entry(resource).or_default() += quantity;
        self.revenue += revenue;
    }
}

/// A placed structure
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingNode {
    pub kind: BuildingKind,
    pub health: u32,
    pub max_health: u32,
    pub market: Option<MarketState>,
}

impl BuildingNode {
    pub fn new(kind: BuildingKind) -> Self {
        let def = kind.def();
        Self {
            kind,
            health: def.max_health,
            max_health: def.max_health,
            market: (kind == BuildingKind::Market).then(MarketState::default),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.health == 0
    }

    /// Whether resource and unit traffic may cross this building
    pub fn is_pathable(&self) -> bool {
        self.kind.def().pathable
    }

    pub fn is_removable(&self) -> bool {
        self.kind.def().removable
    }
}

/// The atomic grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub pos: TilePos,
    pub terrain: TerrainType,
    /// Height sample used for biome classification
    pub height: f32,
    pub resource: Option<ResourceNode>,
    pub building: Option<BuildingNode>,
}

impl Tile {
    pub fn new(pos: TilePos, terrain: TerrainType, height: f32) -> Self {
        Self {
            pos,
            terrain,
            height,
            resource: None,
            building: None,
        }
    }

    /// Traversable by units and shipments right now
    pub fn is_walkable(&self) -> bool {
        match &self.building {
            Some(building) => building.is_pathable() && !building.is_destroyed(),
            None => !self.terrain.is_water(),
        }
    }

    /// Whether the tile carries the cheap "road" cost for resource traffic
    pub fn is_resource_pathable(&self) -> bool {
        self.resource.is_some()
            || self
                .building
                .as_ref()
                .is_some_and(|b| b.is_pathable() && !b.is_destroyed())
    }

    pub fn ascii(&self) -> char {
        if let Some(building) = &self.building {
            return building.kind.ascii();
        }
        if self.resource.is_some() {
            return 'r';
        }
        self.terrain.ascii()
    }
}
