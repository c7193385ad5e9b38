use bevy::prelude::*;

use crate::config::WorldConfig;
use crate::messages::{HarvestResource, SellResource, ShipmentDelivered};
use crate::tick::SimulationSet;

pub mod market;
pub mod reservation;
pub mod stockpile;
pub mod transport;
pub mod treasury;

pub use market::{market_price, sale_value};
pub use reservation::ResourcePool;
pub use stockpile::Stockpile;
pub use transport::{PathCache, Shipments};
pub use treasury::Treasury;

/// Plugin that handles harvesting, sales, cached routes and shipments
pub struct EconomyPlugin;

impl Plugin for EconomyPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<WorldConfig>()
            .cloned()
            .unwrap_or_default();

        // Register resources
        app.insert_resource(Treasury::from_config(&config))
            .insert_resource(transport::Shipments::from_config(&config))
            .init_resource::<Stockpile>()
            .init_resource::<transport::PathCache>();

        // Register messages
        app.add_message::<HarvestResource>()
            .add_message::<SellResource>()
            .add_message::<ShipmentDelivered>();

        // Requests are edits: they run with the rest of the tick's grid changes
        app.add_systems(
            Update,
            (
                transport::handle_harvest_requests,
                transport::handle_sell_requests,
            )
                .in_set(SimulationSet::Edits),
        );

        app.add_systems(
            Update,
            transport::recompute_stale_paths.in_set(SimulationSet::Paths),
        );

        app.add_systems(
            Update,
            transport::advance_shipments.in_set(SimulationSet::Shipments),
        );
    }
}
