//! Recording fakes shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ids::{EntityId, PlayerId};
use crate::location::Location;
use crate::room::Door;
use crate::world::{ShardInventory, World};

#[derive(Default)]
pub(crate) struct FakeWorld {
    refuse: bool,
    next: Mutex<u64>,
    spawned: Mutex<Vec<(String, EntityId)>>,
    despawned: Mutex<Vec<EntityId>>,
    doors: Mutex<Vec<(Location, bool)>>,
}

impl FakeWorld {
    pub(crate) fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub(crate) fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub(crate) fn spawned_kinds(&self) -> Vec<String> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, _)| kind.clone())
            .collect()
    }

    pub(crate) fn despawned(&self) -> Vec<EntityId> {
        self.despawned.lock().unwrap().clone()
    }

    pub(crate) fn doors(&self) -> Vec<(Location, bool)> {
        self.doors.lock().unwrap().clone()
    }
}

impl World for FakeWorld {
    fn spawn_entity(&self, kind: &str, _at: &Location) -> Option<EntityId> {
        if self.refuse {
            return None;
        }
        let mut next = self.next.lock().unwrap();
        *next += 1;
        let entity = EntityId(*next);
        self.spawned.lock().unwrap().push((kind.to_owned(), entity));
        Some(entity)
    }

    fn despawn_entity(&self, entity: EntityId) {
        self.despawned.lock().unwrap().push(entity);
    }

    fn set_door(&self, door: &Door, open: bool) {
        self.doors.lock().unwrap().push((door.location.clone(), open));
    }
}

#[derive(Default)]
pub(crate) struct FakeInventory {
    items: Mutex<HashMap<(String, String), u32>>,
}

impl FakeInventory {
    pub(crate) fn with(player: &str, item_id: &str, amount: u32) -> Self {
        let inventory = Self::default();
        inventory.give(&PlayerId::new(player), item_id, amount);
        inventory
    }
}

impl ShardInventory for FakeInventory {
    fn count(&self, player: &PlayerId, item_id: &str) -> u32 {
        self.items
            .lock()
            .unwrap()
            .get(&(player.as_str().to_owned(), item_id.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    fn remove(&self, player: &PlayerId, item_id: &str, amount: u32) -> bool {
        let mut items = self.items.lock().unwrap();
        let key = (player.as_str().to_owned(), item_id.to_owned());
        match items.get_mut(&key) {
            Some(held) if *held >= amount => {
                *held -= amount;
                true
            }
            _ => false,
        }
    }

    fn give(&self, player: &PlayerId, item_id: &str, amount: u32) -> bool {
        *self
            .items
            .lock()
            .unwrap()
            .entry((player.as_str().to_owned(), item_id.to_owned()))
            .or_default() += amount;
        true
    }
}
