//! Notifications coming in from the host game world.

use dungeon_core::{EntityId, Location, PlayerId};
use serde::{Deserialize, Serialize};

/// One callback from the surrounding game server.
///
/// The serialized form is tagged by `type`, which is what the headless
/// server reads line by line from stdin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A world entity died. Most deaths are unrelated to any dungeon.
    EntityDeath {
        entity: EntityId,
        #[serde(default)]
        killer: Option<PlayerId>,
    },

    /// A player moved between two positions.
    PlayerMoved {
        player: PlayerId,
        from: Location,
        to: Location,
    },

    /// A player used a block that may be a portal.
    PortalInteract { player: PlayerId, location: Location },

    /// A player disconnected.
    PlayerQuit { player: PlayerId },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EntityDeath { .. } => "entity_death",
            Self::PlayerMoved { .. } => "player_moved",
            Self::PortalInteract { .. } => "portal_interact",
            Self::PlayerQuit { .. } => "player_quit",
        }
    }
}
