use bevy::prelude::*;
use std::collections::BTreeMap;

use super::reservation::ResourcePool;
use crate::resources::ResourceType;

/// Inventory held at the home base
#[derive(Resource, Debug, Clone, Default)]
pub struct Stockpile {
    pools: BTreeMap<ResourceType, ResourcePool>,
}

impl Stockpile {
    /// Get total amount of a resource (including reserved)
    pub fn get(&self, resource: ResourceType) -> u32 {
        self.pools.get(&resource).map_or(0, |p| p.total)
    }

    pub fn get_reserved(&self, resource: ResourceType) -> u32 {
        self.pools.get(&resource).map_or(0, |p| p.reserved)
    }

    /// Get available amount of a resource (total - reserved)
    pub fn get_available(&self, resource: ResourceType) -> u32 {
        self.pools.get(&resource).map_or(0, ResourcePool::available)
    }

    pub fn add(&mut self, resource: ResourceType, qty: u32) {
        let pool = self.pools.entry(resource).or_default();
        pool.total = pool.total.saturating_add(qty);
    }

    /// Commit stock to an outgoing shipment.
    /// Returns true if successful, false if not enough available
    pub fn reserve(&mut self, resource: ResourceType, qty: u32) -> bool {
        self.pools.entry(resource).or_default().try_reserve(qty)
    }

    /// Unreserve resources (e.g., a shipment was dropped before leaving)
    pub fn unreserve(&mut self, resource: ResourceType, qty: u32) {
        if let Some(pool) = self.pools.get_mut(&resource) {
            pool.release(qty);
        }
    }

    /// Remove reserved stock from the base; returns how much left
    pub fn consume_reserved(&mut self, resource: ResourceType, qty: u32) -> u32 {
        self.pools
            .get_mut(&resource)
            .map_or(0, |pool| pool.consume_reserved(qty))
    }

    pub fn has_available(&self, resource: ResourceType, qty: u32) -> bool {
        self.get_available(resource) >= qty
    }

    /// Non-empty entries in resource order
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, u32)> + '_ {
        self.pools
            .iter()
            .filter(|(_, p)| p.total > 0)
            .map(|(r, p)| (*r, p.total))
    }
}
