//! Event types for different topics.

use dungeon_core::{EntityId, PlayerId, PortalState, RoomId, RunId};
use serde::{Deserialize, Serialize};

/// Run lifecycle and membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEvent {
    RunCreated { run: RunId, dungeon: String },
    RunStarted { run: RunId },
    PlayerJoined { run: RunId, player: PlayerId },
    PlayerLeft { run: RunId, player: PlayerId },
    RunCompleted { run: RunId, elapsed_secs: u64 },
    RunClosed { run: RunId },
    /// Seconds left before members are sent back.
    CountdownTick { run: RunId, remaining: u32 },
}

/// Room progression inside a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomEvent {
    RoomUnlocked { run: RunId, room: RoomId },
    RoomActivated { run: RunId, room: RoomId, enemies: usize },
    RoomCleared { run: RunId, room: RoomId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossEvent {
    BossSpawned { run: RunId, entity: EntityId },
    BossDefeated { run: RunId, entity: EntityId, killer: Option<PlayerId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortalEvent {
    PortalStateChanged { dungeon: String, state: PortalState },
}
