//! Recording collaborators and the crypt fixture shared by the integration
//! tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use dungeon_core::{
    BlockRegion, BossConfig, Door, DungeonTemplate, EngineConfig, EntityId, Location, PlayerId,
    RewardSpec, RoomConfig, ShardInventory, ShardKind, SpawnPointConfig, World,
};
use instance_runtime::{CollaboratorError, Engine, Messenger, RewardGranter};

#[derive(Default)]
pub struct RecordingWorld {
    next: Mutex<u64>,
    spawned: Mutex<Vec<(String, EntityId)>>,
    despawned: Mutex<Vec<EntityId>>,
    doors: Mutex<Vec<(Location, bool)>>,
}

impl RecordingWorld {
    /// Entities spawned of `kind`, in spawn order.
    pub fn spawned(&self, kind: &str) -> Vec<EntityId> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .filter(|(spawned, _)| spawned == kind)
            .map(|(_, entity)| *entity)
            .collect()
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn despawned(&self) -> Vec<EntityId> {
        self.despawned.lock().unwrap().clone()
    }

    pub fn doors(&self) -> Vec<(Location, bool)> {
        self.doors.lock().unwrap().clone()
    }
}

impl World for RecordingWorld {
    fn spawn_entity(&self, kind: &str, _at: &Location) -> Option<EntityId> {
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
pub struct RecordingInventory {
    items: Mutex<HashMap<(String, String), u32>>,
}

impl RecordingInventory {
    pub fn holding(&self, player: &str, item_id: &str) -> u32 {
        self.count(&PlayerId::new(player), item_id)
    }

    pub fn put(&self, player: &str, item_id: &str, amount: u32) {
        self.give(&PlayerId::new(player), item_id, amount);
    }
}

impl ShardInventory for RecordingInventory {
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
        match items.get_mut(&(player.as_str().to_owned(), item_id.to_owned())) {
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

/// Records every notification. Players in `unreachable` make every call fail.
#[derive(Default)]
pub struct RecordingMessenger {
    unreachable: Mutex<HashSet<PlayerId>>,
    messages: Mutex<Vec<(PlayerId, String)>>,
    titles: Mutex<Vec<(PlayerId, String, String)>>,
    teleports: Mutex<Vec<(PlayerId, Location)>>,
    boss_bars: Mutex<Vec<(PlayerId, bool)>>,
}

impl RecordingMessenger {
    pub fn make_unreachable(&self, player: &str) {
        self.unreachable.lock().unwrap().insert(PlayerId::new(player));
    }

    pub fn messages_for(&self, player: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to.as_str() == player)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn received(&self, player: &str, text: &str) -> bool {
        self.messages_for(player).iter().any(|message| message == text)
    }

    pub fn titles_for(&self, player: &str) -> Vec<(String, String)> {
        self.titles
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _, _)| to.as_str() == player)
            .map(|(_, title, subtitle)| (title.clone(), subtitle.clone()))
            .collect()
    }

    pub fn teleports_for(&self, player: &str) -> Vec<Location> {
        self.teleports
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to.as_str() == player)
            .map(|(_, location)| location.clone())
            .collect()
    }

    /// Show (`true`) and hide (`false`) calls for `player`.
    pub fn boss_bars_for(&self, player: &str) -> Vec<bool> {
        self.boss_bars
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to.as_str() == player)
            .map(|(_, shown)| *shown)
            .collect()
    }

    fn check(&self, player: &PlayerId) -> Result<(), CollaboratorError> {
        if self.unreachable.lock().unwrap().contains(player) {
            return Err(CollaboratorError::new("messenger", format!("{player} is offline")));
        }
        Ok(())
    }
}

impl Messenger for RecordingMessenger {
    fn send_message(&self, player: &PlayerId, text: &str) -> Result<(), CollaboratorError> {
        self.check(player)?;
        self.messages
            .lock()
            .unwrap()
            .push((player.clone(), text.to_owned()));
        Ok(())
    }

    fn send_title(
        &self,
        player: &PlayerId,
        title: &str,
        subtitle: &str,
    ) -> Result<(), CollaboratorError> {
        self.check(player)?;
        self.titles
            .lock()
            .unwrap()
            .push((player.clone(), title.to_owned(), subtitle.to_owned()));
        Ok(())
    }

    fn teleport(&self, player: &PlayerId, to: &Location) -> Result<(), CollaboratorError> {
        self.check(player)?;
        self.teleports
            .lock()
            .unwrap()
            .push((player.clone(), to.clone()));
        Ok(())
    }

    fn show_boss_bar(&self, player: &PlayerId, _boss: &str) -> Result<(), CollaboratorError> {
        self.check(player)?;
        self.boss_bars.lock().unwrap().push((player.clone(), true));
        Ok(())
    }

    fn hide_boss_bar(&self, player: &PlayerId) -> Result<(), CollaboratorError> {
        self.check(player)?;
        self.boss_bars.lock().unwrap().push((player.clone(), false));
        Ok(())
    }
}

/// Records grants. Players in `refused` always fail.
#[derive(Default)]
pub struct RecordingRewards {
    refused: Mutex<HashSet<PlayerId>>,
    grants: Mutex<Vec<(PlayerId, RewardSpec)>>,
}

impl RecordingRewards {
    pub fn refuse(&self, player: &str) {
        self.refused.lock().unwrap().insert(PlayerId::new(player));
    }

    pub fn grants_for(&self, player: &str) -> Vec<RewardSpec> {
        self.grants
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to.as_str() == player)
            .map(|(_, reward)| reward.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.grants.lock().unwrap().len()
    }
}

impl RewardGranter for RecordingRewards {
    fn grant_reward(&self, player: &PlayerId, reward: &RewardSpec) -> Result<(), CollaboratorError> {
        if self.refused.lock().unwrap().contains(player) {
            return Err(CollaboratorError::new("rewards", "inventory full"));
        }
        self.grants
            .lock()
            .unwrap()
            .push((player.clone(), reward.clone()));
        Ok(())
    }
}

/// An engine wired to recording collaborators.
pub struct Harness {
    pub engine: Engine,
    pub world: Arc<RecordingWorld>,
    pub inventory: Arc<RecordingInventory>,
    pub messenger: Arc<RecordingMessenger>,
    pub rewards: Arc<RecordingRewards>,
}

impl Harness {
    pub fn new(templates: Vec<DungeonTemplate>) -> Self {
        Self::with_config(EngineConfig::default(), templates)
    }

    pub fn with_config(config: EngineConfig, templates: Vec<DungeonTemplate>) -> Self {
        let world = Arc::new(RecordingWorld::default());
        let inventory = Arc::new(RecordingInventory::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let rewards = Arc::new(RecordingRewards::default());
        let engine = Engine::builder()
            .config(config)
            .templates(templates)
            .world(world.clone())
            .inventory(inventory.clone())
            .messenger(messenger.clone())
            .rewards(rewards.clone())
            .build()
            .unwrap();
        Self {
            engine,
            world,
            inventory,
            messenger,
            rewards,
        }
    }

    /// Alice holds one crypt shard in a crypt-only engine.
    pub fn crypt() -> Self {
        let harness = Self::new(vec![crypt()]);
        harness.inventory.put("alice", "crypt_shard", 1);
        harness
    }

    /// Opens the crypt portal with Alice's shard, then lets each player in.
    pub fn enter(&self, players: &[&str]) {
        self.engine
            .on_portal_interact(player("alice"), portal())
            .unwrap();
        for name in players {
            self.engine.on_portal_interact(player(name), portal()).unwrap();
        }
    }

    /// Walks `name` from the entry point into `region`.
    pub fn walk_into(&self, name: &str, target: Location) {
        self.engine
            .on_player_moved(player(name), entry_point(), target)
            .unwrap();
    }

    /// Kills every entity of `kind` spawned so far.
    pub fn kill_all(&self, kind: &str, killer: &str) {
        for entity in self.world.spawned(kind) {
            self.engine
                .on_entity_death(entity, Some(player(killer)))
                .unwrap();
        }
    }

    /// Ticks the scheduler `times` times.
    pub fn tick(&self, times: usize) {
        for _ in 0..times {
            self.engine.tick().unwrap();
        }
    }
}

pub fn player(name: &str) -> PlayerId {
    PlayerId::new(name)
}

pub fn portal() -> Location {
    Location::new("world", 100.0, 64.0, 100.0)
}

pub fn entry_point() -> Location {
    Location::new("dungeon", -5.0, 64.0, -5.0)
}

pub fn exit_point() -> Location {
    Location::new("world", 100.0, 64.0, 105.0)
}

fn region(x: f64, z: f64) -> BlockRegion {
    BlockRegion::from_corners(
        &Location::new("dungeon", x, 60.0, z),
        &Location::new("dungeon", x + 10.0, 70.0, z + 10.0),
    )
}

pub fn room_1_center() -> Location {
    Location::new("dungeon", 5.0, 64.0, 5.0)
}

pub fn room_2_center() -> Location {
    Location::new("dungeon", 25.0, 64.0, 25.0)
}

pub fn boss_center() -> Location {
    Location::new("dungeon", 45.0, 64.0, 45.0)
}

/// Two rooms (three skeletons, then nothing), a lich, one player minimum,
/// two maximum and a five second countdown.
pub fn crypt() -> DungeonTemplate {
    DungeonTemplate::new("crypt", entry_point(), exit_point())
        .with_portal(portal())
        .with_players(1, 2)
        .with_countdown(5)
        .with_room(
            RoomConfig::new("room_1", 1, region(0.0, 0.0)).with_spawn(SpawnPointConfig::new(
                "skeletons",
                room_1_center(),
                "skeleton",
                3,
            )),
        )
        .with_room(RoomConfig::new("room_2", 2, region(20.0, 20.0)))
        .with_boss(BossConfig::new(
            "boss_room",
            region(40.0, 40.0),
            "lich",
            boss_center(),
        ))
        .with_reward(RewardSpec::item("gold", 10))
}

/// The crypt's lich, but rising as soon as its room unlocks.
fn eager_lich() -> BossConfig {
    BossConfig {
        spawn_on_entry: false,
        ..BossConfig::new("boss_room", region(40.0, 40.0), "lich", boss_center())
    }
}

/// A crypt whose only room is empty, guarding an eager lich.
pub fn quiet_crypt() -> DungeonTemplate {
    DungeonTemplate::new("crypt", entry_point(), exit_point())
        .with_portal(portal())
        .with_players(1, 2)
        .with_room(RoomConfig::new("room_1", 1, region(0.0, 0.0)))
        .with_boss(eager_lich())
        .with_reward(RewardSpec::item("gold", 10))
}

/// A crypt with no rooms at all in front of an eager lich.
pub fn lich_lair() -> DungeonTemplate {
    DungeonTemplate::new("crypt", entry_point(), exit_point())
        .with_portal(portal())
        .with_players(1, 2)
        .with_boss(eager_lich())
}

/// A second dungeon with its own portal and a reusable key.
pub fn vault() -> DungeonTemplate {
    DungeonTemplate::new(
        "vault",
        Location::new("vault", 0.0, 64.0, 0.0),
        Location::new("world", -100.0, 64.0, -105.0),
    )
    .with_portal(Location::new("world", -100.0, 64.0, -100.0))
    .with_shard(ShardKind::Reusable, 1)
}
