//! Bookkeeping of spawned enemies per room.
//!
//! The tracker answers one question for the sequencer: is this room done?
//! A room counts as cleared only after it registered at least one spawn in
//! its current activation and every one of those spawns has died. A room
//! with nothing spawned is *not* reported as cleared here; the sequencer
//! handles empty rooms explicitly.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{DungeonError, Result};
use crate::ids::{EntityId, RoomId};
use crate::room::SpawnPoint;
use crate::world::World;

/// Enemy-to-room bindings for a single run.
#[derive(Debug, Default, Clone)]
pub struct EncounterTracker {
    entity_rooms: HashMap<EntityId, RoomId>,
    room_entities: HashMap<RoomId, HashSet<EntityId>>,
    /// Rooms that registered at least one spawn since their last clear.
    seeded: HashSet<RoomId>,
}

impl EncounterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `entity` to `room`, moving it out of any room it was bound to.
    pub fn register_spawn(&mut self, room: &str, entity: EntityId) {
        if let Some(previous) = self.entity_rooms.insert(entity, room.to_owned())
            && previous != room
            && let Some(set) = self.room_entities.get_mut(&previous)
        {
            set.remove(&entity);
        }
        self.room_entities
            .entry(room.to_owned())
            .or_default()
            .insert(entity);
        self.seeded.insert(room.to_owned());
    }

    /// Spawns every unit of every spawn point and binds the results to `room`.
    ///
    /// Returns the ids the world handed back; refused spawns are skipped.
    pub fn spawn_room(
        &mut self,
        room: &str,
        spawn_points: &[SpawnPoint],
        world: &dyn World,
    ) -> Vec<EntityId> {
        let mut spawned = Vec::new();
        for point in spawn_points {
            for _ in 0..point.count {
                match world.spawn_entity(&point.enemy_type, &point.location) {
                    Some(entity) => {
                        self.register_spawn(room, entity);
                        spawned.push(entity);
                    }
                    None => warn!(
                        target: "core::encounter",
                        room,
                        spawn_point = %point.id,
                        enemy = %point.enemy_type,
                        "World refused to spawn enemy"
                    ),
                }
            }
        }
        debug!(target: "core::encounter", room, count = spawned.len(), "Room enemies spawned");
        spawned
    }

    /// Removes the binding of a dead entity and reports the room it belonged to.
    pub fn on_death(&mut self, entity: EntityId) -> Result<RoomId> {
        let room = self
            .entity_rooms
            .remove(&entity)
            .ok_or(DungeonError::UntrackedEntity(entity))?;
        if let Some(set) = self.room_entities.get_mut(&room) {
            set.remove(&entity);
        }
        Ok(room)
    }

    pub fn room_of(&self, entity: EntityId) -> Option<&str> {
        self.entity_rooms.get(&entity).map(String::as_str)
    }

    pub fn is_tracked(&self, entity: EntityId) -> bool {
        self.entity_rooms.contains_key(&entity)
    }

    /// Live enemies still bound to `room`.
    pub fn remaining(&self, room: &str) -> usize {
        self.room_entities.get(room).map_or(0, HashSet::len)
    }

    pub fn is_cleared(&self, room: &str) -> bool {
        self.seeded.contains(room) && self.remaining(room) == 0
    }

    /// Snapshot of the entities bound to `room`, sorted by id.
    pub fn entities_in(&self, room: &str) -> Vec<EntityId> {
        let mut entities: Vec<_> = self
            .room_entities
            .get(room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        entities.sort_unstable();
        entities
    }

    /// Drops every binding of `room` and despawns those entities.
    ///
    /// Returns how many live entities were despawned.
    pub fn clear_room(&mut self, room: &str, world: &dyn World) -> usize {
        self.seeded.remove(room);
        let Some(entities) = self.room_entities.remove(room) else {
            return 0;
        };
        for entity in &entities {
            self.entity_rooms.remove(entity);
            world.despawn_entity(*entity);
        }
        entities.len()
    }

    /// Clears every room this tracker knows about.
    pub fn clear_all(&mut self, world: &dyn World) -> usize {
        let rooms: Vec<RoomId> = self.room_entities.keys().cloned().collect();
        let despawned = rooms
            .iter()
            .map(|room| self.clear_room(room, world))
            .sum();
        self.seeded.clear();
        despawned
    }

    /// Total live bindings across all rooms.
    pub fn binding_count(&self) -> usize {
        self.entity_rooms.len()
    }
}
