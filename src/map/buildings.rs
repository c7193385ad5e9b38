use serde::{Deserialize, Serialize};

use crate::map::tiles::TerrainType;
use crate::resources::ResourceType;

/// Structures that can be placed on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingKind {
    HomeBase,  // Destination of every harvested resource
    Road,      // Cheap resource traffic over land
    Bridge,    // Makes water traversable
    Wall,      // Blocks traversal
    Harvester, // Built atop an existing resource node
    Farm,      // Places its own grain node
    Market,    // Sells stock shipped from the home base
}

/// How a building interacts with the tile's resource node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRule {
    /// Tile must not hold a resource
    Forbidden,
    /// Tile must already hold a resource
    Required,
    /// Tile must be empty; placement creates this resource underneath
    Places(ResourceType),
}

#[derive(Debug, Clone, Copy)]
pub struct BuildingDef {
    pub kind: BuildingKind,
    pub surfaces: &'static [TerrainType],
    pub pathable: bool,
    pub removable: bool,
    pub resource_rule: ResourceRule,
    pub max_health: u32,
    pub cost: u32,
}

pub const BUILDING_DEFS: &[BuildingDef] = &[
    BuildingDef {
        kind: BuildingKind::HomeBase,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        pathable: true,
        removable: false,
        resource_rule: ResourceRule::Forbidden,
        max_health: 500,
        cost: 0,
    },
    BuildingDef {
        kind: BuildingKind::Road,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        pathable: true,
        removable: true,
        resource_rule: ResourceRule::Forbidden,
        max_health: 40,
        cost: 10,
    },
    BuildingDef {
        kind: BuildingKind::Bridge,
        surfaces: &[TerrainType::Water],
        pathable: true,
        removable: true,
        resource_rule: ResourceRule::Forbidden,
        max_health: 60,
        cost: 50,
    },
    BuildingDef {
        kind: BuildingKind::Wall,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        pathable: false,
        removable: true,
        resource_rule: ResourceRule::Forbidden,
        max_health: 150,
        cost: 25,
    },
    BuildingDef {
        kind: BuildingKind::Harvester,
        surfaces: &[TerrainType::Land, TerrainType::Highland],
        pathable: true,
        removable: true,
        resource_rule: ResourceRule::Required,
        max_health: 80,
        cost: 100,
    },
    BuildingDef {
        kind: BuildingKind::Farm,
        surfaces: &[TerrainType::Land],
        pathable: true,
        removable: true,
        resource_rule: ResourceRule::Places(ResourceType::Grain),
        max_health: 60,
        cost: 75,
    },
    BuildingDef {
        kind: BuildingKind::Market,
        surfaces: &[TerrainType::Land],
        pathable: true,
        removable: true,
        resource_rule: ResourceRule::Forbidden,
        max_health: 120,
        cost: 200,
    },
];

impl BuildingKind {
    pub fn def(self) -> &'static BuildingDef {
        BUILDING_DEFS
            .iter()
            .find(|d| d.kind == self)
            .unwrap_or(&BUILDING_DEFS[0])
    }

    pub fn allows_surface(self, terrain: TerrainType) -> bool {
        self.def().surfaces.contains(&terrain)
    }

    pub fn ascii(self) -> char {
        match self {
            BuildingKind::HomeBase => 'H',
            BuildingKind::Road => '+',
            BuildingKind::Bridge => '=',
            BuildingKind::Wall => '#',
            BuildingKind::Harvester => 'h',
            BuildingKind::Farm => 'f',
            BuildingKind::Market => 'M',
        }
    }

    /// Buildings that let their tile's resource node be harvested
    pub fn harvests(self) -> bool {
        matches!(self, BuildingKind::Harvester | BuildingKind::Farm)
    }

    /// Refund paid out when the building is removed by its owner
    pub fn refund(self) -> u32 {
        self.def().cost * crate::constants::REMOVAL_REFUND_PERCENT / 100
    }
}
