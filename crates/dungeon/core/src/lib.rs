//! Synchronous domain model of dungeon instances.
//!
//! `dungeon-core` holds the state machines of a single run: ordered rooms,
//! enemy tracking, the boss encounter, the entry portal and its shard rule.
//! Nothing here performs I/O or blocks. Side effects on the host world go
//! through the [`World`] and [`ShardInventory`] traits, and every
//! transition reports a typed [`DungeonError`] instead of panicking.
pub mod boss;
pub mod config;
pub mod encounter;
pub mod error;
pub mod ids;
pub mod location;
pub mod portal;
pub mod room;
pub mod run;
pub mod shard;
pub mod template;
pub mod time;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use boss::BossEncounter;
pub use config::{DEFAULT_MESSAGES, EngineConfig};
pub use encounter::EncounterTracker;
pub use error::{DungeonError, ErrorSeverity, Result, Transition};
pub use ids::{EntityId, PlayerId, RoomId, RunId};
pub use location::{BlockRegion, Location};
pub use portal::{Portal, PortalState};
pub use room::{ActivateOutcome, ClearOutcome, Door, Room, RoomSequencer, RoomState, SpawnPoint};
pub use run::{DeathOutcome, DungeonRun, JoinOutcome, RoomActivation, RunSnapshot, RunState};
pub use shard::{MAX_TIER, ShardDefinition, ShardGate};
pub use template::{
    BossConfig, DoorConfig, DungeonTemplate, RewardKind, RewardSpec, RoomConfig, ShardKind,
    ShardSpec, SpawnPointConfig,
};
pub use time::format_duration;
pub use world::{ShardInventory, World};
