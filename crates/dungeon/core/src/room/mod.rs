//! Combat rooms and their in-order sequencing.
//!
//! A room only ever advances `Locked -> Unlocked -> Active -> Cleared`.
//! The single way back is [`RoomSequencer::reset`], which returns every room
//! to `Locked` and unlocks the first one again.

mod sequencer;

pub use sequencer::{ActivateOutcome, ClearOutcome, RoomSequencer};

use crate::ids::RoomId;
use crate::location::{BlockRegion, Location};
use crate::template::{DoorConfig, RoomConfig, SpawnPointConfig};
use crate::world::World;

/// Lifecycle of a single room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    /// Not yet reachable.
    Locked,
    /// Reachable; enemies spawn when a player walks in.
    Unlocked,
    /// Enemies spawned and being fought.
    Active,
    /// Every tracked enemy is dead and the door is open.
    Cleared,
}

/// Barrier sealing a room. Tracks whether the world currently shows it open.
#[derive(Clone, Debug, PartialEq)]
pub struct Door {
    pub location: Location,
    pub kind: String,
    pub width: u32,
    pub height: u32,
    open: bool,
}

impl Door {
    fn from_config(config: &DoorConfig) -> Self {
        Self {
            location: config.location.clone(),
            kind: config.kind.clone(),
            width: config.width,
            height: config.height,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self, world: &dyn World) {
        if !self.open {
            self.open = true;
            world.set_door(self, true);
        }
    }

    fn close(&mut self, world: &dyn World) {
        if self.open {
            self.open = false;
            world.set_door(self, false);
        }
    }
}

/// Where, what and how many enemies a room spawns on activation.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnPoint {
    pub id: String,
    pub location: Location,
    pub enemy_type: String,
    pub count: u32,
}

impl From<&SpawnPointConfig> for SpawnPoint {
    fn from(config: &SpawnPointConfig) -> Self {
        Self {
            id: config.id.clone(),
            location: config.location.clone(),
            enemy_type: config.enemy_type.clone(),
            count: config.count,
        }
    }
}

/// One combat area of a run.
#[derive(Clone, Debug)]
pub struct Room {
    id: RoomId,
    order: i32,
    bounds: BlockRegion,
    door: Option<Door>,
    spawn_points: Vec<SpawnPoint>,
    state: RoomState,
}

impl Room {
    pub fn from_config(config: &RoomConfig) -> Self {
        Self {
            id: config.id.clone(),
            order: config.order,
            bounds: config.bounds.clone(),
            door: config.door.as_ref().map(Door::from_config),
            spawn_points: config.spawn_points.iter().map(SpawnPoint::from).collect(),
            state: RoomState::Locked,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn bounds(&self) -> &BlockRegion {
        &self.bounds
    }

    pub fn door(&self) -> Option<&Door> {
        self.door.as_ref()
    }

    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn_points
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    /// Total enemies this room spawns when activated.
    pub fn enemy_count(&self) -> u32 {
        self.spawn_points.iter().map(|s| s.count).sum()
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.bounds.contains(location)
    }

    pub fn is_cleared(&self) -> bool {
        self.state == RoomState::Cleared
    }

    fn unlock(&mut self) -> bool {
        if self.state != RoomState::Locked {
            return false;
        }
        self.state = RoomState::Unlocked;
        true
    }

    fn activate(&mut self) -> bool {
        if self.state != RoomState::Unlocked {
            return false;
        }
        self.state = RoomState::Active;
        true
    }

    fn clear(&mut self, world: &dyn World) -> bool {
        if self.state != RoomState::Active {
            return false;
        }
        self.state = RoomState::Cleared;
        if let Some(door) = &mut self.door {
            door.open(world);
        }
        true
    }

    fn reset(&mut self, world: &dyn World) {
        self.state = RoomState::Locked;
        if let Some(door) = &mut self.door {
            door.close(world);
        }
    }
}
