//! Harvest and sale requests, and settling shipments when they arrive.

use bevy::prelude::*;
use thiserror::Error;

use super::path_cache::PathCache;
use super::shipments::{
    Destination, Payload, ShipmentError, ShipmentId, ShipmentOutcome, Shipments,
};
use crate::economy::market::sale_value;
use crate::economy::{Stockpile, Treasury};
use crate::map::editing::{PlacementError, WorldEditor};
use crate::map::grid::{Harvest, TileGrid};
use crate::map::islands::IslandTracker;
use crate::map::tile_pos::TilePos;
use crate::messages::{HarvestResource, SellResource, ShipmentDelivered};

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum LogisticsError {
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Shipment(#[from] ShipmentError),
    #[error("nothing on {0:?} harvests its resource")]
    NoHarvester(TilePos),
    #[error("no route between {0:?} and the home base")]
    RouteUnavailable(TilePos),
}

/// What one harvest at `node` would ship, if harvesting is allowed right now.
/// The node's route must be fresh and available so the shipment leaves at once.
pub fn harvest_payload(
    grid: &TileGrid,
    cache: &PathCache,
    node: TilePos,
) -> Result<Payload, LogisticsError> {
    let tile = grid
        .get_tile(node)
        .ok_or(PlacementError::OutOfBounds(node))?;
    if !tile.building.as_ref().is_some_and(|b| b.kind.harvests()) {
        return Err(LogisticsError::NoHarvester(node));
    }
    let resource = match &tile.resource {
        Some(n) if !n.is_depleted() => n.resource,
        _ => return Err(PlacementError::NoResource(node).into()),
    };
    if cache.is_stale(node) || !cache.path_available(node) {
        return Err(LogisticsError::RouteUnavailable(node));
    }
    Ok(Payload {
        resource,
        quantity: resource.def().yield_per_harvest,
    })
}

/// Harvest once at `node` and ship the yield to the home base
pub fn harvest_and_ship(
    grid: &mut TileGrid,
    islands: &mut IslandTracker,
    cache: &mut PathCache,
    shipments: &mut Shipments,
    node: TilePos,
    elapsed: f32,
) -> Result<(ShipmentId, Harvest), LogisticsError> {
    let payload = harvest_payload(grid, cache, node)?;
    let id = shipments.begin_shipment(cache, node, payload, Destination::HomeBase, elapsed)?;
    match grid.harvest(node, &mut [islands, cache]) {
        Ok(harvest) => Ok((id, harvest)),
        Err(err) => {
            shipments.cancel(id);
            Err(err.into())
        }
    }
}

/// Reserve stock at the home base and ship it to `market`
pub fn sell_from_base(
    cache: &PathCache,
    stockpile: &mut Stockpile,
    shipments: &mut Shipments,
    market: TilePos,
    payload: Payload,
    elapsed: f32,
) -> Result<ShipmentId, LogisticsError> {
    let home = cache
        .home_base()
        .ok_or(LogisticsError::RouteUnavailable(market))?;
    if cache.is_blocked(market) {
        return Err(LogisticsError::RouteUnavailable(market));
    }
    if !stockpile.reserve(payload.resource, payload.quantity) {
        return Err(ShipmentError::InsufficientStock {
            resource: payload.resource,
            requested: payload.quantity,
            available: stockpile.get_available(payload.resource),
        }
        .into());
    }
    shipments
        .begin_shipment(cache, home, payload, Destination::Market(market), elapsed)
        .map_err(|err| {
            stockpile.unreserve(payload.resource, payload.quantity);
            err.into()
        })
}

/// Apply a shipment outcome to the stockpile, treasury and market books.
/// Returns the delivery notice for completed shipments.
pub fn settle(
    outcome: &ShipmentOutcome,
    stockpile: &mut Stockpile,
    treasury: &mut Treasury,
    grid: &mut TileGrid,
) -> Option<ShipmentDelivered> {
    match *outcome {
        ShipmentOutcome::Departed {
            payload,
            destination: Destination::Market(_),
            ..
        } => {
            stockpile.consume_reserved(payload.resource, payload.quantity);
            None
        }
        ShipmentOutcome::Departed { .. } => None,
        ShipmentOutcome::Dropped {
            payload,
            destination: Destination::Market(_),
            ..
        } => {
            stockpile.unreserve(payload.resource, payload.quantity);
            None
        }
        ShipmentOutcome::Dropped { .. } => None,
        ShipmentOutcome::Delivered {
            id,
            payload,
            destination,
            ..
        } => {
            let revenue = match destination {
                Destination::HomeBase => {
                    stockpile.add(payload.resource, payload.quantity);
                    0
                }
                Destination::Market(pos) => {
                    let Some(market) = grid.market_mut(pos) else {
                        warn!(
                            "Market at {:?} is gone; {} {:?} lost",
                            pos, payload.quantity, payload.resource
                        );
                        return None;
                    };
                    let revenue = sale_value(payload.resource, payload.quantity);
                    market.record_sale(payload.resource, payload.quantity, u64::from(revenue));
                    treasury.add(revenue);
                    revenue
                }
            };
            Some(ShipmentDelivered {
                id,
                resource: payload.resource,
                quantity: payload.quantity,
                destination,
                revenue,
            })
        }
    }
}

pub fn handle_harvest_requests(
    mut requests: MessageReader<HarvestResource>,
    mut editor: WorldEditor,
    mut shipments: ResMut<Shipments>,
    time: Res<Time>,
) {
    for request in requests.read() {
        if let Err(err) = harvest_with_editor(
            &mut editor,
            &mut shipments,
            request.node,
            time.elapsed_secs(),
        ) {
            warn!("Harvest at {:?} rejected: {}", request.node, err);
        }
    }
}

fn harvest_with_editor(
    editor: &mut WorldEditor,
    shipments: &mut Shipments,
    node: TilePos,
    elapsed: f32,
) -> Result<ShipmentId, LogisticsError> {
    let payload = harvest_payload(editor.grid(), editor.cache(), node)?;
    let id = shipments.begin_shipment(
        editor.cache(),
        node,
        payload,
        Destination::HomeBase,
        elapsed,
    )?;
    if let Err(err) = editor.harvest(node) {
        shipments.cancel(id);
        return Err(err.into());
    }
    Ok(id)
}

pub fn handle_sell_requests(
    mut requests: MessageReader<SellResource>,
    cache: Res<PathCache>,
    mut stockpile: ResMut<Stockpile>,
    mut shipments: ResMut<Shipments>,
    time: Res<Time>,
) {
    for request in requests.read() {
        let payload = Payload {
            resource: request.resource,
            quantity: request.quantity,
        };
        if let Err(err) = sell_from_base(
            &cache,
            &mut stockpile,
            &mut shipments,
            request.market,
            payload,
            time.elapsed_secs(),
        ) {
            warn!("Sale at {:?} rejected: {}", request.market, err);
        }
    }
}

/// Runs after every edit of the tick has been applied
pub fn recompute_stale_paths(
    grid: Res<TileGrid>,
    islands: Res<IslandTracker>,
    mut cache: ResMut<PathCache>,
) {
    if cache.stale_count() > 0 {
        cache.recompute_stale(&grid, &islands);
    }
}

pub fn advance_shipments(
    time: Res<Time>,
    cache: Res<PathCache>,
    mut shipments: ResMut<Shipments>,
    mut stockpile: ResMut<Stockpile>,
    mut treasury: ResMut<Treasury>,
    mut grid: ResMut<TileGrid>,
    mut delivered: MessageWriter<ShipmentDelivered>,
) {
    let outcomes = shipments.tick(&cache, time.elapsed_secs(), time.delta_secs());
    for outcome in &outcomes {
        if let Some(notice) = settle(outcome, &mut stockpile, &mut treasury, &mut grid) {
            debug!(
                "Shipment {:?} delivered {} {:?}",
                notice.id, notice.quantity, notice.resource
            );
            delivered.write(notice);
        }
    }
}
