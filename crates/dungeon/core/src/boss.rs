//! Terminal boss room and its single tracked boss entity.

use tracing::{debug, info, warn};

use crate::ids::{EntityId, RoomId};
use crate::location::{BlockRegion, Location};
use crate::room::RoomState;
use crate::template::BossConfig;
use crate::world::World;

/// Boss room of a run.
///
/// Holds at most one live boss. `defeated == true` implies no live boss id.
#[derive(Clone, Debug)]
pub struct BossEncounter {
    id: RoomId,
    bounds: BlockRegion,
    boss_type: String,
    spawn_point: Location,
    spawn_on_entry: bool,
    state: RoomState,
    boss: Option<EntityId>,
    defeated: bool,
}

impl BossEncounter {
    pub fn from_config(config: &BossConfig) -> Self {
        Self {
            id: config.id.clone(),
            bounds: config.bounds.clone(),
            boss_type: config.boss_type.clone(),
            spawn_point: config.spawn_point.clone(),
            spawn_on_entry: config.spawn_on_entry,
            state: RoomState::Locked,
            boss: None,
            defeated: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bounds(&self) -> &BlockRegion {
        &self.bounds
    }

    pub fn boss_type(&self) -> &str {
        &self.boss_type
    }

    pub fn spawn_point(&self) -> &Location {
        &self.spawn_point
    }

    pub fn spawn_on_entry(&self) -> bool {
        self.spawn_on_entry
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn boss_id(&self) -> Option<EntityId> {
        self.boss
    }

    pub fn is_alive(&self) -> bool {
        self.boss.is_some()
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Opens the boss room once every ordinary room is cleared.
    pub fn unlock(&mut self) -> bool {
        if self.state != RoomState::Locked {
            return false;
        }
        self.state = RoomState::Unlocked;
        debug!(target: "core::boss", room = %self.id, "Boss room unlocked");
        true
    }

    /// Whether the move `from -> to` walks into the boss room.
    pub fn entered(&self, from: &Location, to: &Location) -> bool {
        self.bounds.entered(from, to)
    }

    /// Spawns the boss if it is neither alive nor defeated.
    ///
    /// Returns the live boss id, which is the existing one when the boss was
    /// already spawned (no second world request is made). Returns `None`
    /// once defeated or when the world refused the spawn.
    pub fn spawn(&mut self, world: &dyn World) -> Option<EntityId> {
        if self.defeated {
            return None;
        }
        if let Some(existing) = self.boss {
            return Some(existing);
        }
        let Some(entity) = world.spawn_entity(&self.boss_type, &self.spawn_point) else {
            warn!(
                target: "core::boss",
                room = %self.id,
                boss = %self.boss_type,
                "World refused to spawn boss"
            );
            return None;
        };
        self.boss = Some(entity);
        self.state = RoomState::Active;
        info!(target: "core::boss", room = %self.id, %entity, "Boss spawned");
        Some(entity)
    }

    /// Pure predicate: does `entity` belong to this encounter?
    pub fn is_target(&self, entity: EntityId) -> bool {
        self.boss == Some(entity)
    }

    /// Records the boss death. Returns true exactly once per spawned boss.
    pub fn on_death(&mut self, entity: EntityId) -> bool {
        if !self.is_target(entity) {
            return false;
        }
        self.boss = None;
        self.defeated = true;
        self.state = RoomState::Cleared;
        info!(target: "core::boss", room = %self.id, %entity, "Boss defeated");
        true
    }

    /// Despawns a stale boss and clears every flag.
    pub fn reset(&mut self, world: &dyn World) {
        if let Some(stale) = self.boss.take() {
            world.despawn_entity(stale);
        }
        self.defeated = false;
        self.state = RoomState::Locked;
    }
}
