pub mod map;
pub mod pathfinding;
pub mod transport;

pub use map::{DamageBuilding, GridChanged, PlaceBuilding, RemoveBuilding};
pub use pathfinding::PathResolved;
pub use transport::{HarvestResource, SellResource, ShipmentDelivered};
