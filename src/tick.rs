use bevy::prelude::*;

/// Per-tick ordering: grid edits and their invalidations, then stale path
/// recomputation and pending path requests, then shipment movement.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum SimulationSet {
    Edits,
    Paths,
    Shipments,
}

pub struct TickPlugin;

impl Plugin for TickPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                SimulationSet::Edits,
                SimulationSet::Paths,
                SimulationSet::Shipments,
            )
                .chain(),
        );
    }
}
