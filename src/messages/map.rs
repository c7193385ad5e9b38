use bevy::prelude::*;

use crate::map::buildings::BuildingKind;
use crate::map::grid::TileChange;
use crate::map::tile_pos::TilePos;

/// Published after every applied grid edit. Nothing in the core reads it.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridChanged {
    pub change: TileChange,
}

impl GridChanged {
    pub fn pos(&self) -> TilePos {
        self.change.pos
    }
}

/// Request to build on a tile, paid from the treasury
#[derive(Message, Debug, Clone, Copy)]
pub struct PlaceBuilding {
    pub pos: TilePos,
    pub kind: BuildingKind,
}

/// Owner-initiated removal with a partial refund
#[derive(Message, Debug, Clone, Copy)]
pub struct RemoveBuilding {
    pub pos: TilePos,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct DamageBuilding {
    pub pos: TilePos,
    pub amount: u32,
}

#[cfg(test)]
mod tests {
    use crate::messages::*;

    #[test]
    fn map_messages_are_send_sync() {
        fn assert_message<T: Send + Sync + 'static>() {}

        assert_message::<GridChanged>();
        assert_message::<PlaceBuilding>();
        assert_message::<RemoveBuilding>();
        assert_message::<DamageBuilding>();
    }
}
