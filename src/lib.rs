//! Tile logistics - a chunked tile world with incremental island tracking,
//! weighted pathfinding and cached resource routes.
//!
//! Every structure can be driven directly from plain Rust; the plugins wire
//! them into a Bevy app with one ordered tick.

use bevy::app::PluginGroup;

use crate::economy::EconomyPlugin;
use crate::map::MapPlugin;
use crate::pathfinding::PathfindingPlugin;
use crate::tick::TickPlugin;

pub mod config;
pub mod constants;
pub mod economy;
pub mod map;
pub mod messages;
pub mod pathfinding;
pub mod resources;
pub mod tick;

#[cfg(test)]
mod test_utils;

/// Plugin group for the simulation core (headless)
/// Insert a `WorldConfig` before adding it to change the generated world
pub struct LogicPlugins;

impl PluginGroup for LogicPlugins {
    fn build(self) -> bevy::app::PluginGroupBuilder {
        bevy::app::PluginGroupBuilder::start::<Self>()
            .add(TickPlugin)
            .add(MapPlugin)
            .add(PathfindingPlugin)
            .add(EconomyPlugin)
    }
}
