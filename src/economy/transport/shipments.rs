//! In-flight resource transports.
//!
//! A shipment copies its route out of the [`PathCache`] when it departs and
//! follows that copy to the end, even if the cached route is invalidated or a
//! tile on it is destroyed while it travels.

use bevy::prelude::*;
use thiserror::Error;

use super::path_cache::{PathCache, RouteEndpoint};
use crate::config::WorldConfig;
use crate::constants::{SHIPMENT_RETRY_BUDGET, SHIPMENT_SPEED};
use crate::map::tile_pos::TilePos;
use crate::resources::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShipmentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Harvested goods go into the home stockpile
    HomeBase,
    /// Stock sold at the market on this tile
    Market(TilePos),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub resource: ResourceType,
    pub quantity: u32,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ShipmentError {
    #[error("shipments must carry at least one unit")]
    ZeroQuantity,
    #[error("no resource node tracked at {0:?}")]
    NoResourceNode(TilePos),
    #[error("no market tracked at {0:?}")]
    UnknownMarket(TilePos),
    #[error("market shipments leave from the home base, not {0:?}")]
    NotFromHomeBase(TilePos),
    #[error("need {requested} {resource:?}, only {available} in stock")]
    InsufficientStock {
        resource: ResourceType,
        requested: u32,
        available: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentState {
    /// Route unavailable; retried every tick
    Waiting { retries: u32 },
    InTransit {
        path: Vec<TilePos>,
        /// Tiles covered so far
        progress: f32,
        departed_at: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub id: ShipmentId,
    pub origin: TilePos,
    pub destination: Destination,
    pub payload: Payload,
    pub state: ShipmentState,
}

impl Shipment {
    /// Cache key of the route this shipment uses
    fn route_key(&self) -> TilePos {
        match self.destination {
            Destination::HomeBase => self.origin,
            Destination::Market(market) => market,
        }
    }

    pub fn is_in_transit(&self) -> bool {
        matches!(self.state, ShipmentState::InTransit { .. })
    }

    /// Tile the shipment currently occupies
    pub fn position(&self) -> TilePos {
        match &self.state {
            ShipmentState::Waiting { .. } => self.origin,
            ShipmentState::InTransit { path, progress, .. } => {
                let steps = (*progress as usize).min(path.len());
                steps
                    .checked_sub(1)
                    .and_then(|i| path.get(i))
                    .copied()
                    .unwrap_or(self.origin)
            }
        }
    }
}

/// What happened to a shipment during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShipmentOutcome {
    Departed {
        id: ShipmentId,
        payload: Payload,
        destination: Destination,
    },
    Delivered {
        id: ShipmentId,
        payload: Payload,
        destination: Destination,
        travel_time: f32,
    },
    /// Retry budget spent or route endpoint gone before departure
    Dropped {
        id: ShipmentId,
        payload: Payload,
        destination: Destination,
    },
}

#[derive(Resource, Debug, Clone)]
pub struct Shipments {
    next_id: u64,
    active: Vec<Shipment>,
    /// Departures that happened outside `tick`, reported by the next `tick`
    departed: Vec<ShipmentOutcome>,
    /// Tiles per second
    speed: f32,
    retry_budget: u32,
}

impl Default for Shipments {
    fn default() -> Self {
        Self::new(SHIPMENT_SPEED, SHIPMENT_RETRY_BUDGET)
    }
}

impl Shipments {
    pub fn new(speed: f32, retry_budget: u32) -> Self {
        Self {
            next_id: 0,
            active: Vec::new(),
            departed: Vec::new(),
            speed,
            retry_budget,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.shipment_speed, config.shipment_retry_budget)
    }

    pub fn get(&self, id: ShipmentId) -> Option<&Shipment> {
        self.active.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shipment> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Start a shipment from `from` to `destination`. Home deliveries start at a
    /// resource node; market sales start at the home base.
    ///
    /// If the cached route is fresh and available the path is copied right away
    /// and the shipment is in transit; otherwise it waits and retries each tick.
    pub fn begin_shipment(
        &mut self,
        cache: &PathCache,
        from: TilePos,
        payload: Payload,
        destination: Destination,
        elapsed: f32,
    ) -> Result<ShipmentId, ShipmentError> {
        if payload.quantity == 0 {
            return Err(ShipmentError::ZeroQuantity);
        }
        match destination {
            Destination::HomeBase => {
                if cache.route(from).map(|r| r.endpoint) != Some(RouteEndpoint::ResourceNode) {
                    return Err(ShipmentError::NoResourceNode(from));
                }
            }
            Destination::Market(market) => {
                if cache.route(market).map(|r| r.endpoint) != Some(RouteEndpoint::Market) {
                    return Err(ShipmentError::UnknownMarket(market));
                }
                if cache.home_base() != Some(from) {
                    return Err(ShipmentError::NotFromHomeBase(from));
                }
            }
        }

        let id = ShipmentId(self.next_id);
        self.next_id += 1;
        let mut shipment = Shipment {
            id,
            origin: from,
            destination,
            payload,
            state: ShipmentState::Waiting { retries: 0 },
        };
        if let Some(path) = departure_path(cache, &shipment) {
            self.departed.push(depart(&mut shipment, path, elapsed));
        }
        self.active.push(shipment);
        Ok(id)
    }

    /// Forget a shipment. A cancelled shipment never reports an outcome; the
    /// caller owns whatever it carried.
    pub fn cancel(&mut self, id: ShipmentId) -> Option<Shipment> {
        let index = self.active.iter().position(|s| s.id == id)?;
        self.departed.retain(|outcome| outcome.id() != id);
        Some(self.active.remove(index))
    }

    /// Dispatch waiting shipments and move travelling ones `delta` seconds forward
    pub fn tick(&mut self, cache: &PathCache, elapsed: f32, delta: f32) -> Vec<ShipmentOutcome> {
        let mut outcomes = std::mem::take(&mut self.departed);
        let speed = self.speed;
        let retry_budget = self.retry_budget;

        self.active.retain_mut(|shipment| {
            if let ShipmentState::InTransit {
                path,
                progress,
                departed_at,
            } = &mut shipment.state
            {
                *progress += speed * delta;
                if *progress < path.len() as f32 {
                    return true;
                }
                outcomes.push(ShipmentOutcome::Delivered {
                    id: shipment.id,
                    payload: shipment.payload,
                    destination: shipment.destination,
                    travel_time: elapsed - *departed_at,
                });
                return false;
            }

            let dropped = ShipmentOutcome::Dropped {
                id: shipment.id,
                payload: shipment.payload,
                destination: shipment.destination,
            };
            if cache.route(shipment.route_key()).is_none() {
                outcomes.push(dropped);
                return false;
            }
            if let Some(path) = departure_path(cache, shipment) {
                outcomes.push(depart(shipment, path, elapsed));
                return true;
            }
            if let ShipmentState::Waiting { retries } = &mut shipment.state {
                *retries += 1;
                if *retries <= retry_budget {
                    return true;
                }
            }
            warn!(
                "Dropping shipment {:?} of {:?} after {} retries",
                shipment.id, shipment.payload.resource, retry_budget
            );
            outcomes.push(dropped);
            false
        });
        outcomes
    }
}

impl ShipmentOutcome {
    pub fn id(&self) -> ShipmentId {
        match self {
            ShipmentOutcome::Departed { id, .. }
            | ShipmentOutcome::Delivered { id, .. }
            | ShipmentOutcome::Dropped { id, .. } => *id,
        }
    }
}

/// Copy of the cached route if it can be travelled right now
fn departure_path(cache: &PathCache, shipment: &Shipment) -> Option<Vec<TilePos>> {
    let key = shipment.route_key();
    if cache.is_stale(key) || !cache.path_available(key) {
        return None;
    }
    match shipment.destination {
        Destination::HomeBase => cache.path(key).map(<[TilePos]>::to_vec),
        Destination::Market(market) => cache.outbound_path(market),
    }
}

fn depart(shipment: &mut Shipment, path: Vec<TilePos>, elapsed: f32) -> ShipmentOutcome {
    shipment.state = ShipmentState::InTransit {
        path,
        progress: 0.0,
        departed_at: elapsed,
    };
    ShipmentOutcome::Departed {
        id: shipment.id,
        payload: shipment.payload,
        destination: shipment.destination,
    }
}
