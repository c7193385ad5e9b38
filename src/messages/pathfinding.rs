use bevy::prelude::*;

use crate::map::tile_pos::TilePos;
use crate::pathfinding::PathTicket;

/// Result of an asynchronous path request. `path` is `None` when no path
/// exists or the expansion budget ran out.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct PathResolved {
    pub ticket: PathTicket,
    pub path: Option<Vec<TilePos>>,
}
