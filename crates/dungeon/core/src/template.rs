//! Static dungeon layouts supplied by the template store.
//!
//! Templates are read-only to the core: a run captures an `Arc` of the
//! template it was created from and keeps using it even if the store reloads.

use std::collections::HashSet;

use crate::error::{DungeonError, Result};
use crate::location::{BlockRegion, Location};

/// Authored description of one dungeon.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DungeonTemplate {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_name: Option<String>,
    /// Block players interact with to enter; templates without one get no portal.
    #[cfg_attr(feature = "serde", serde(default))]
    pub portal_location: Option<Location>,
    pub entry_point: Location,
    pub exit_point: Location,
    #[cfg_attr(feature = "serde", serde(default))]
    pub shard: ShardSpec,
    #[cfg_attr(feature = "serde", serde(default = "defaults::min_players"))]
    pub min_players: u32,
    #[cfg_attr(feature = "serde", serde(default = "defaults::max_players"))]
    pub max_players: u32,
    /// Seconds a run may take before it is stopped; 0 disables the limit.
    #[cfg_attr(feature = "serde", serde(default = "defaults::time_limit"))]
    pub time_limit: u32,
    /// Seconds between victory and teleport-out.
    #[cfg_attr(feature = "serde", serde(default = "defaults::completion_countdown"))]
    pub completion_countdown: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rooms: Vec<RoomConfig>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub boss: Option<BossConfig>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rewards: Vec<RewardSpec>,
}

#[cfg(feature = "serde")]
mod defaults {
    pub(super) fn min_players() -> u32 {
        super::DungeonTemplate::DEFAULT_MIN_PLAYERS
    }
    pub(super) fn max_players() -> u32 {
        super::DungeonTemplate::DEFAULT_MAX_PLAYERS
    }
    pub(super) fn time_limit() -> u32 {
        super::DungeonTemplate::DEFAULT_TIME_LIMIT
    }
    pub(super) fn completion_countdown() -> u32 {
        super::DungeonTemplate::DEFAULT_COMPLETION_COUNTDOWN
    }
    pub(super) fn door_kind() -> String {
        "BLOCK_BARRIER".to_owned()
    }
    pub(super) fn door_width() -> u32 {
        1
    }
    pub(super) fn door_height() -> u32 {
        3
    }
    pub(super) fn spawn_on_entry() -> bool {
        true
    }
    pub(super) fn shard_tier() -> u8 {
        1
    }
}

impl DungeonTemplate {
    pub const DEFAULT_MIN_PLAYERS: u32 = 1;
    pub const DEFAULT_MAX_PLAYERS: u32 = 4;
    pub const DEFAULT_TIME_LIMIT: u32 = 1800;
    pub const DEFAULT_COMPLETION_COUNTDOWN: u32 = 30;

    /// Creates a template with default limits and no rooms.
    pub fn new(name: impl Into<String>, entry_point: Location, exit_point: Location) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            portal_location: None,
            entry_point,
            exit_point,
            shard: ShardSpec::default(),
            min_players: Self::DEFAULT_MIN_PLAYERS,
            max_players: Self::DEFAULT_MAX_PLAYERS,
            time_limit: Self::DEFAULT_TIME_LIMIT,
            completion_countdown: Self::DEFAULT_COMPLETION_COUNTDOWN,
            rooms: Vec::new(),
            boss: None,
            rewards: Vec::new(),
        }
    }

    pub fn with_portal(mut self, location: Location) -> Self {
        self.portal_location = Some(location);
        self
    }

    pub fn with_shard(mut self, kind: ShardKind, tier: u8) -> Self {
        self.shard = ShardSpec { kind, tier };
        self
    }

    pub fn with_players(mut self, min: u32, max: u32) -> Self {
        self.min_players = min;
        self.max_players = max;
        self
    }

    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn with_countdown(mut self, seconds: u32) -> Self {
        self.completion_countdown = seconds;
        self
    }

    pub fn with_room(mut self, room: RoomConfig) -> Self {
        self.rooms.push(room);
        self
    }

    pub fn with_boss(mut self, boss: BossConfig) -> Self {
        self.boss = Some(boss);
        self
    }

    pub fn with_reward(mut self, reward: RewardSpec) -> Self {
        self.rewards.push(reward);
        self
    }

    /// Name shown to players, falling back to the template name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Checks the structural rules a run relies on.
    ///
    /// Rooms sharing an order index are accepted; they are sequenced by
    /// their position in `rooms`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| DungeonError::InvalidTemplate {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        if self.min_players == 0 {
            return Err(invalid("min_players must be at least 1".into()));
        }
        if self.min_players > self.max_players {
            return Err(invalid(format!(
                "min_players ({}) exceeds max_players ({})",
                self.min_players, self.max_players
            )));
        }

        let mut ids = HashSet::new();
        for room in &self.rooms {
            if !ids.insert(room.id.as_str()) {
                return Err(invalid(format!("duplicate room id '{}'", room.id)));
            }
            if let Some(spawn) = room.spawn_points.iter().find(|s| s.count == 0) {
                return Err(invalid(format!(
                    "spawn point '{}' in room '{}' has a zero count",
                    spawn.id, room.id
                )));
            }
        }
        if let Some(boss) = &self.boss
            && ids.contains(boss.id.as_str())
        {
            return Err(invalid(format!(
                "boss room id '{}' collides with a room id",
                boss.id
            )));
        }

        Ok(())
    }
}

/// One combat room as authored.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomConfig {
    pub id: String,
    pub order: i32,
    pub bounds: BlockRegion,
    #[cfg_attr(feature = "serde", serde(default))]
    pub door: Option<DoorConfig>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spawn_points: Vec<SpawnPointConfig>,
}

impl RoomConfig {
    pub fn new(id: impl Into<String>, order: i32, bounds: BlockRegion) -> Self {
        Self {
            id: id.into(),
            order,
            bounds,
            door: None,
            spawn_points: Vec::new(),
        }
    }

    pub fn with_door(mut self, door: DoorConfig) -> Self {
        self.door = Some(door);
        self
    }

    pub fn with_spawn(mut self, spawn: SpawnPointConfig) -> Self {
        self.spawn_points.push(spawn);
        self
    }
}

/// Barrier that keeps a room sealed until it is cleared.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorConfig {
    pub location: Location,
    #[cfg_attr(feature = "serde", serde(default = "defaults::door_kind"))]
    pub kind: String,
    #[cfg_attr(feature = "serde", serde(default = "defaults::door_width"))]
    pub width: u32,
    #[cfg_attr(feature = "serde", serde(default = "defaults::door_height"))]
    pub height: u32,
}

impl DoorConfig {
    pub fn barrier(location: Location) -> Self {
        Self {
            location,
            kind: "BLOCK_BARRIER".to_owned(),
            width: 1,
            height: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnPointConfig {
    pub id: String,
    pub location: Location,
    pub enemy_type: String,
    pub count: u32,
}

impl SpawnPointConfig {
    pub fn new(
        id: impl Into<String>,
        location: Location,
        enemy_type: impl Into<String>,
        count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            location,
            enemy_type: enemy_type.into(),
            count,
        }
    }
}

/// Terminal room holding the boss.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BossConfig {
    pub id: String,
    pub bounds: BlockRegion,
    pub boss_type: String,
    pub spawn_point: Location,
    #[cfg_attr(feature = "serde", serde(default = "defaults::spawn_on_entry"))]
    pub spawn_on_entry: bool,
}

impl BossConfig {
    pub fn new(
        id: impl Into<String>,
        bounds: BlockRegion,
        boss_type: impl Into<String>,
        spawn_point: Location,
    ) -> Self {
        Self {
            id: id.into(),
            bounds,
            boss_type: boss_type.into(),
            spawn_point,
            spawn_on_entry: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum RewardKind {
    #[default]
    Item,
    Experience,
    Currency,
}

/// One reward handed to every member on victory.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardSpec {
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: RewardKind,
    pub item_id: String,
    pub amount: u32,
}

impl RewardSpec {
    pub fn item(item_id: impl Into<String>, amount: u32) -> Self {
        Self {
            kind: RewardKind::Item,
            item_id: item_id.into(),
            amount,
        }
    }
}

/// How the access shard behaves when a portal is unlocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ShardKind {
    /// One unit is removed per activation.
    #[default]
    Consumable,
    /// Possession is enough; nothing is removed.
    Reusable,
    /// Possession of this tier or higher is enough; nothing is removed.
    Tiered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShardSpec {
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: ShardKind,
    #[cfg_attr(feature = "serde", serde(default = "defaults::shard_tier"))]
    pub tier: u8,
}

impl Default for ShardSpec {
    fn default() -> Self {
        Self {
            kind: ShardKind::Consumable,
            tier: 1,
        }
    }
}
