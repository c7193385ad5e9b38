use bevy::prelude::*;
use std::time::Duration;

use super::*;
use crate::economy::{Stockpile, Treasury};
use crate::map::buildings::BuildingKind;
use crate::map::editing::{damage_building, place_building};
use crate::map::grid::TileGrid;
use crate::map::islands::IslandTracker;
use crate::map::tile_pos::TilePos;
use crate::messages::{GridChanged, HarvestResource, SellResource, ShipmentDelivered};
use crate::resources::ResourceType;
use crate::test_utils::drain_messages;
use crate::tick::{SimulationSet, TickPlugin};

fn fresh(rows: &[&str]) -> (TileGrid, IslandTracker, PathCache) {
    let grid = TileGrid::from_ascii(rows).unwrap();
    let islands = IslandTracker::from_grid(&grid);
    let mut cache = PathCache::from_grid(&grid);
    cache.recompute_stale(&grid, &islands);
    (grid, islands, cache)
}

fn logistics_app(rows: &[&str], shipments: Shipments) -> App {
    let (grid, islands, cache) = fresh(rows);
    let mut app = App::new();
    app.add_plugins(TickPlugin)
        .insert_resource(grid)
        .insert_resource(islands)
        .insert_resource(cache)
        .insert_resource(shipments)
        .insert_resource(Treasury::new(0))
        .init_resource::<Stockpile>()
        .init_resource::<Time>()
        .add_message::<GridChanged>()
        .add_message::<HarvestResource>()
        .add_message::<SellResource>()
        .add_message::<ShipmentDelivered>()
        .add_systems(
            Update,
            (
                (handle_harvest_requests, handle_sell_requests).in_set(SimulationSet::Edits),
                recompute_stale_paths.in_set(SimulationSet::Paths),
                advance_shipments.in_set(SimulationSet::Shipments),
            ),
        );
    app
}

fn step(app: &mut App, seconds: f32) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_secs_f32(seconds));
    app.update();
}

#[test]
fn destroyed_bridge_cuts_the_corridor() {
    let (mut grid, mut islands, mut cache) = fresh(&["h=======H"]);
    let node = TilePos::new(0, 0);
    assert_eq!(cache.path(node).map(<[TilePos]>::len), Some(8));
    assert!(cache.path_available(node));

    damage_building(
        &mut grid,
        &mut islands,
        &mut cache,
        TilePos::new(4, 0),
        10_000,
    )
    .unwrap();
    assert!(cache.is_stale(node));
    assert!(!islands.is_same_island(node, TilePos::new(8, 0)));

    cache.recompute_stale(&grid, &islands);
    assert!(!cache.path_available(node));
    assert!(cache.is_blocked(node));

    let mut shipments = Shipments::default();
    assert_eq!(
        harvest_and_ship(&mut grid, &mut islands, &mut cache, &mut shipments, node, 0.0),
        Err(LogisticsError::RouteUnavailable(node))
    );
}

#[test]
fn destroyed_bridge_reroutes_over_land_when_possible() {
    let (mut grid, mut islands, mut cache) = fresh(&["h=======H", "........."]);
    let node = TilePos::new(0, 0);
    assert_eq!(cache.path(node).map(<[TilePos]>::len), Some(8));

    damage_building(
        &mut grid,
        &mut islands,
        &mut cache,
        TilePos::new(4, 0),
        10_000,
    )
    .unwrap();
    cache.recompute_stale(&grid, &islands);
    assert!(cache.path_available(node));
    let detour = cache.path(node).unwrap();
    assert_eq!(detour.len(), 10);
    assert!(detour.contains(&TilePos::new(4, 1)));
}

#[test]
fn rebuilt_bridge_restores_the_route() {
    let (mut grid, mut islands, mut cache) = fresh(&["h=~=H"]);
    let node = TilePos::new(0, 0);
    assert!(cache.is_blocked(node));

    place_building(
        &mut grid,
        &mut islands,
        &mut cache,
        TilePos::new(2, 0),
        BuildingKind::Bridge,
    )
    .unwrap();
    cache.recompute_stale(&grid, &islands);
    assert!(cache.path_available(node));
    assert_eq!(cache.path(node).map(<[TilePos]>::len), Some(4));
}

#[test]
fn harvest_requires_a_harvesting_building() {
    let (mut grid, mut islands, mut cache) = fresh(&["r.H"]);
    let mut shipments = Shipments::default();
    let node = TilePos::new(0, 0);
    assert_eq!(
        harvest_and_ship(&mut grid, &mut islands, &mut cache, &mut shipments, node, 0.0),
        Err(LogisticsError::NoHarvester(node))
    );
    assert!(shipments.is_empty());
}

#[test]
fn last_harvest_depletes_the_node_but_still_ships() {
    let (mut grid, mut islands, mut cache) = fresh(&["h.H"]);
    let node = TilePos::new(0, 0);
    let durability = ResourceType::Wood.def().durability;
    let mut shipments = Shipments::new(100.0, 0);

    for _ in 0..durability {
        let (_, harvest) =
            harvest_and_ship(&mut grid, &mut islands, &mut cache, &mut shipments, node, 0.0)
                .unwrap();
        assert_eq!(harvest.resource, ResourceType::Wood);
    }
    assert!(grid.get_tile(node).unwrap().resource.is_none());
    assert!(cache.route(node).is_none());
    assert_eq!(shipments.len(), durability as usize);
    assert!(shipments.iter().all(Shipment::is_in_transit));

    let outcomes = shipments.tick(&cache, 1.0, 1.0);
    let delivered = outcomes
        .iter()
        .filter(|o| matches!(o, ShipmentOutcome::Delivered { .. }))
        .count();
    assert_eq!(delivered, durability as usize);
}

#[test]
fn harvested_goods_reach_the_stockpile() {
    let mut app = logistics_app(&["h...H"], Shipments::new(1.0, 3));
    app.world_mut()
        .resource_mut::<Messages<HarvestResource>>()
        .write(HarvestResource {
            node: TilePos::new(0, 0),
        });

    for _ in 0..3 {
        step(&mut app, 1.0);
        assert_eq!(app.world().resource::<Stockpile>().get(ResourceType::Wood), 0);
    }
    step(&mut app, 1.0);
    assert_eq!(app.world().resource::<Stockpile>().get(ResourceType::Wood), 3);
    assert!(app.world().resource::<Shipments>().is_empty());

    let delivered = drain_messages::<ShipmentDelivered>(app.world_mut());
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].destination, Destination::HomeBase);
    assert_eq!(delivered[0].revenue, 0);
}

#[test]
fn sales_pay_the_treasury_and_fill_the_market_books() {
    let mut app = logistics_app(&["M..H"], Shipments::new(10.0, 3));
    app.world_mut()
        .resource_mut::<Stockpile>()
        .add(ResourceType::Iron, 5);
    let market = TilePos::new(0, 0);
    app.world_mut()
        .resource_mut::<Messages<SellResource>>()
        .write(SellResource {
            market,
            resource: ResourceType::Iron,
            quantity: 4,
        });

    step(&mut app, 1.0);

    let world = app.world();
    assert_eq!(world.resource::<Stockpile>().get(ResourceType::Iron), 1);
    assert_eq!(world.resource::<Stockpile>().get_reserved(ResourceType::Iron), 0);
    assert_eq!(world.resource::<Treasury>().total(), 80);
    let books = world.resource::<TileGrid>().market(market).unwrap();
    assert_eq!(books.sold.get(&ResourceType::Iron), Some(&4));
    assert_eq!(books.revenue, 80);
}

#[test]
fn sales_need_stock() {
    let (_, _, cache) = fresh(&["M.H"]);
    let mut stockpile = Stockpile::default();
    stockpile.add(ResourceType::Gold, 1);
    let mut shipments = Shipments::default();
    let payload = Payload {
        resource: ResourceType::Gold,
        quantity: 2,
    };
    assert_eq!(
        sell_from_base(
            &cache,
            &mut stockpile,
            &mut shipments,
            TilePos::new(0, 0),
            payload,
            0.0
        ),
        Err(LogisticsError::Shipment(ShipmentError::InsufficientStock {
            resource: ResourceType::Gold,
            requested: 2,
            available: 1,
        }))
    );
    assert_eq!(stockpile.get_reserved(ResourceType::Gold), 0);
}

#[test]
fn dropped_sale_returns_its_reservation() {
    let (mut grid, _, cache) = fresh(&["M.H"]);
    let mut stockpile = Stockpile::default();
    let mut treasury = Treasury::new(0);
    stockpile.add(ResourceType::Stone, 3);
    stockpile.reserve(ResourceType::Stone, 3);

    let payload = Payload {
        resource: ResourceType::Stone,
        quantity: 3,
    };
    let dropped = ShipmentOutcome::Dropped {
        id: ShipmentId(7),
        payload,
        destination: Destination::Market(TilePos::new(0, 0)),
    };
    assert_eq!(settle(&dropped, &mut stockpile, &mut treasury, &mut grid), None);
    assert_eq!(stockpile.get_available(ResourceType::Stone), 3);
    assert!(cache.route(TilePos::new(0, 0)).is_some());
}

#[test]
fn sale_to_a_removed_market_pays_nothing() {
    let (mut grid, mut islands, mut cache) = fresh(&["M.H"]);
    let market = TilePos::new(0, 0);
    grid.clear_building(market, &mut [&mut islands, &mut cache])
        .unwrap();

    let mut stockpile = Stockpile::default();
    let mut treasury = Treasury::new(0);
    let delivered = ShipmentOutcome::Delivered {
        id: ShipmentId(1),
        payload: Payload {
            resource: ResourceType::Gold,
            quantity: 1,
        },
        destination: Destination::Market(market),
        travel_time: 1.0,
    };
    assert_eq!(
        settle(&delivered, &mut stockpile, &mut treasury, &mut grid),
        None
    );
    assert_eq!(treasury.total(), 0);
}
