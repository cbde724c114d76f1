use tracing::{debug, info};

use super::{Room, RoomState};
use crate::encounter::EncounterTracker;
use crate::error::{DungeonError, Result, Transition};
use crate::ids::{EntityId, RoomId};
use crate::location::Location;
use crate::template::RoomConfig;
use crate::world::World;

/// Result of activating a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivateOutcome {
    /// Enemies spawned for the room.
    pub spawned: Vec<EntityId>,
    /// Set when nothing spawned and the room was cleared on the spot.
    pub cleared: Option<ClearOutcome>,
}

/// Result of clearing a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearOutcome {
    /// Rooms that became `Cleared`, in order. The first entry is the room
    /// that was cleared; later entries are empty rooms that cleared as soon
    /// as they were unlocked.
    pub cleared: Vec<RoomId>,
    /// Room left `Unlocked` by this clear, if any.
    pub unlocked: Option<RoomId>,
    /// Every room of the run is now cleared.
    pub all_cleared: bool,
}

/// Ordered rooms of one run.
///
/// Rooms are sorted by ascending order index; ties keep their template
/// order. At most one room is `Unlocked` or `Active` at a time, every room
/// before it is `Cleared` and every room after it is `Locked`.
#[derive(Clone, Debug, Default)]
pub struct RoomSequencer {
    rooms: Vec<Room>,
}

impl RoomSequencer {
    pub fn new(configs: &[RoomConfig]) -> Self {
        let mut sequencer = Self::default();
        sequencer.initialize(configs);
        sequencer
    }

    /// Rebuilds the room list from the template and unlocks the first room.
    pub fn initialize(&mut self, configs: &[RoomConfig]) {
        let mut rooms: Vec<Room> = configs.iter().map(Room::from_config).collect();
        // `sort_by_key` is stable, so equal order indices keep list order.
        rooms.sort_by_key(Room::order);
        self.rooms = rooms;
        if let Some(first) = self.rooms.first_mut() {
            first.unlock();
        }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id() == id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.rooms
            .iter()
            .position(|room| room.id() == id)
            .ok_or_else(|| DungeonError::UnknownRoom(id.to_owned()))
    }

    /// Transitions an `Unlocked` room to `Active` and spawns its enemies.
    ///
    /// A room that ends up with nothing spawned is cleared immediately.
    pub fn activate(
        &mut self,
        id: &str,
        tracker: &mut EncounterTracker,
        world: &dyn World,
    ) -> Result<ActivateOutcome> {
        let index = self.position(id)?;
        let room = &mut self.rooms[index];
        match room.state() {
            RoomState::Locked => return Err(DungeonError::RoomLocked(id.to_owned())),
            RoomState::Active | RoomState::Cleared => {
                return Err(DungeonError::AlreadyProcessed(Transition::ActivateRoom));
            }
            RoomState::Unlocked => {}
        }

        room.activate();
        let spawned = tracker.spawn_room(room.id(), room.spawn_points(), world);
        info!(
            target: "core::room",
            room = id,
            enemies = spawned.len(),
            "Room activated"
        );

        let cleared = spawned
            .is_empty()
            .then(|| self.clear_at(index, tracker, world));
        Ok(ActivateOutcome { spawned, cleared })
    }

    /// Marks a room `Cleared`, opens its door and unlocks the next room.
    ///
    /// An `Unlocked` room is passed through `Active` first, which lets an
    /// operator force-clear a room nobody entered yet.
    pub fn clear(
        &mut self,
        id: &str,
        tracker: &mut EncounterTracker,
        world: &dyn World,
    ) -> Result<ClearOutcome> {
        let index = self.position(id)?;
        match self.rooms[index].state() {
            RoomState::Locked => Err(DungeonError::RoomLocked(id.to_owned())),
            RoomState::Cleared => Err(DungeonError::AlreadyProcessed(Transition::ClearRoom)),
            RoomState::Unlocked => {
                self.rooms[index].activate();
                Ok(self.clear_at(index, tracker, world))
            }
            RoomState::Active => Ok(self.clear_at(index, tracker, world)),
        }
    }

    /// Clears `id` if it is active and the tracker reports no survivors.
    pub fn clear_if_done(
        &mut self,
        id: &str,
        tracker: &mut EncounterTracker,
        world: &dyn World,
    ) -> Result<Option<ClearOutcome>> {
        let index = self.position(id)?;
        if self.rooms[index].state() != RoomState::Active || !tracker.is_cleared(id) {
            return Ok(None);
        }
        Ok(Some(self.clear_at(index, tracker, world)))
    }

    fn clear_at(
        &mut self,
        index: usize,
        tracker: &mut EncounterTracker,
        world: &dyn World,
    ) -> ClearOutcome {
        let room = &mut self.rooms[index];
        room.clear(world);
        // Drops leftovers of a forced clear and resets the seeded flag.
        tracker.clear_room(room.id(), world);
        let mut cleared = vec![room.id().to_owned()];
        info!(target: "core::room", room = room.id(), "Room cleared");

        let mut unlocked = None;
        let mut next = index + 1;
        while let Some(room) = self.rooms.get_mut(next) {
            if !room.unlock() {
                break;
            }
            if !room.spawn_points().is_empty() {
                debug!(target: "core::room", room = room.id(), "Room unlocked");
                unlocked = Some(room.id().to_owned());
                break;
            }
            // Nothing to fight: the room clears as soon as it opens.
            room.activate();
            room.clear(world);
            debug!(target: "core::room", room = room.id(), "Empty room cleared on unlock");
            cleared.push(room.id().to_owned());
            next += 1;
        }

        ClearOutcome {
            cleared,
            unlocked,
            all_cleared: self.all_cleared(),
        }
    }

    /// True iff every room is `Cleared` (vacuously true with no rooms).
    pub fn all_cleared(&self) -> bool {
        self.rooms.iter().all(Room::is_cleared)
    }

    /// Returns every room to `Locked`, despawns tracked enemies and unlocks
    /// the first room.
    pub fn reset(&mut self, tracker: &mut EncounterTracker, world: &dyn World) {
        for room in &mut self.rooms {
            room.reset(world);
        }
        tracker.clear_all(world);
        if let Some(first) = self.rooms.first_mut() {
            first.unlock();
        }
    }

    /// First room that is not yet cleared.
    pub fn current_room(&self) -> Option<&Room> {
        self.rooms.iter().find(|room| !room.is_cleared())
    }

    /// Zero-based index of the current room; the last index once all are cleared.
    pub fn current_index(&self) -> usize {
        self.rooms
            .iter()
            .position(|room| !room.is_cleared())
            .unwrap_or_else(|| self.rooms.len().saturating_sub(1))
    }

    pub fn cleared_count(&self) -> usize {
        self.rooms.iter().filter(|room| room.is_cleared()).count()
    }

    /// Rooms whose bounds the move `from -> to` enters.
    pub fn entered<'a>(
        &'a self,
        from: &'a Location,
        to: &'a Location,
    ) -> impl Iterator<Item = &'a Room> + 'a {
        self.rooms
            .iter()
            .filter(move |room| room.bounds().entered(from, to))
    }
}
