use serde::{Deserialize, Serialize};

use crate::map::tiles::TerrainType;

/// Types of resources that can be harvested from tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    // Natural, spawned by terrain generation
    Wood,
    Stone,
    Copper,
    Iron,
    Gold,
    Crystal,
    // Produced by farms only
    Grain,
}

/// Static description of a resource type.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDef {
    pub resource: ResourceType,
    /// Relative weight in the placement draw; zero means it never spawns naturally
    pub spawn_rate: f64,
    /// Ring (distance band from the world centre) where this resource belongs
    pub tier: u32,
    pub surfaces: &'static [TerrainType],
    /// Harvests before the node is depleted
    pub durability: u32,
    /// Units shipped per harvest
    pub yield_per_harvest: u32,
}

pub const RESOURCE_DEFS: &[ResourceDef] = &[
    ResourceDef {
        resource: ResourceType::Wood,
        spawn_rate: 1.0,
        tier: 0,
        surfaces: &[TerrainType::Land],
        durability: 40,
        yield_per_harvest: 3,
    },
    ResourceDef {
        resource: ResourceType::Stone,
        spawn_rate: 0.8,
        tier: 0,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        durability: 60,
        yield_per_harvest: 2,
    },
    ResourceDef {
        resource: ResourceType::Copper,
        spawn_rate: 0.6,
        tier: 1,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        durability: 30,
        yield_per_harvest: 2,
    },
    ResourceDef {
        resource: ResourceType::Iron,
        spawn_rate: 0.5,
        tier: 2,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        durability: 30,
        yield_per_harvest: 2,
    },
    ResourceDef {
        resource: ResourceType::Gold,
        spawn_rate: 0.25,
        tier: 3,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        durability: 15,
        yield_per_harvest: 1,
    },
    ResourceDef {
        resource: ResourceType::Crystal,
        spawn_rate: 0.15,
        tier: 3,
        surfaces: &[TerrainType::Highland, TerrainType::Land],
        durability: 10,
        yield_per_harvest: 1,
    },
    ResourceDef {
        resource: ResourceType::Grain,
        spawn_rate: 0.0,
        tier: 0,
        surfaces: &[TerrainType::Land],
        durability: u32::MAX,
        yield_per_harvest: 4,
    },
];

/// Highest tier any resource uses
pub const MAX_TIER: u32 = 3;

impl ResourceType {
    pub fn def(self) -> &'static ResourceDef {
        RESOURCE_DEFS
            .iter()
            .find(|d| d.resource == self)
            .unwrap_or(&RESOURCE_DEFS[0])
    }

    pub fn spawns_naturally(self) -> bool {
        self.def().spawn_rate > 0.0
    }

    pub fn can_spawn_on(self, terrain: TerrainType) -> bool {
        self.def().surfaces.contains(&terrain)
    }
}

/// Resources placed by terrain generation
pub fn natural_resources() -> impl Iterator<Item = &'static ResourceDef> {
    RESOURCE_DEFS.iter().filter(|d| d.spawn_rate > 0.0)
}
