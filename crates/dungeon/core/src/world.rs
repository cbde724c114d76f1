//! Side-effect seams into the host game world.
//!
//! The core never spawns, despawns or edits blocks itself. It asks these
//! collaborators and records whatever ids they hand back. Implementations
//! are expected to be cheap, non-blocking and fire-and-forget.

use crate::ids::{EntityId, PlayerId};
use crate::location::Location;
use crate::room::Door;

/// Entity and block primitives of the host world.
pub trait World: Send + Sync {
    /// Spawns one entity of `kind` at `at`; `None` when the world refused.
    fn spawn_entity(&self, kind: &str, at: &Location) -> Option<EntityId>;

    /// Removes an entity if it is still alive.
    fn despawn_entity(&self, entity: EntityId);

    /// Places (`open == false`) or removes (`open == true`) a door barrier.
    fn set_door(&self, door: &Door, open: bool);
}

/// Player inventory access used by the shard gate.
pub trait ShardInventory: Send + Sync {
    /// Units of `item_id` the player currently holds.
    fn count(&self, player: &PlayerId, item_id: &str) -> u32;

    /// Removes `amount` units; false when the player does not hold enough.
    fn remove(&self, player: &PlayerId, item_id: &str, amount: u32) -> bool;

    /// Adds `amount` units; false when the inventory refused.
    fn give(&self, player: &PlayerId, item_id: &str, amount: u32) -> bool;
}
