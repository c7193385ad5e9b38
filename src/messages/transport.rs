use bevy::prelude::*;

use crate::economy::transport::{Destination, ShipmentId};
use crate::map::tile_pos::TilePos;
use crate::resources::ResourceType;

/// Harvest one yield from a resource node and ship it to the home base
#[derive(Message, Debug, Clone, Copy)]
pub struct HarvestResource {
    pub node: TilePos,
}

/// Ship stock from the home base to a market and sell it on arrival
#[derive(Message, Debug, Clone, Copy)]
pub struct SellResource {
    pub market: TilePos,
    pub resource: ResourceType,
    pub quantity: u32,
}

/// A shipment reached its destination and was settled
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipmentDelivered {
    pub id: ShipmentId,
    pub resource: ResourceType,
    pub quantity: u32,
    pub destination: Destination,
    /// Money credited for a sale, zero for home deliveries
    pub revenue: u32,
}
