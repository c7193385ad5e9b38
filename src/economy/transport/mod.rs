// Cached routes to the home base
pub mod path_cache;
pub use path_cache::{CachedRoute, PathCache, RouteEndpoint};

// In-flight shipments
pub mod shipments;
pub use shipments::{
    Destination, Payload, Shipment, ShipmentError, ShipmentId, ShipmentOutcome, ShipmentState,
    Shipments,
};

// Harvest/sale handling and delivery settlement (Logic Layer)
pub mod harvest;
pub use harvest::{
    LogisticsError, advance_shipments, handle_harvest_requests, handle_sell_requests,
    harvest_and_ship, harvest_payload, recompute_stale_paths, sell_from_base, settle,
};

#[cfg(test)]
mod tests;
