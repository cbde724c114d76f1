//! Collaborators of the headless host.
//!
//! Every side effect the engine asks for is written to stdout as one JSON
//! line, so whatever drives the process can apply it to the real world.
//! Shards are kept in memory.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dungeon_core::{
    Door, EntityId, Location, PlayerId, RewardSpec, RunSnapshot, ShardInventory, World,
};
use instance_runtime::{CollaboratorError, Event, Messenger, RewardGranter};
use serde::Serialize;
use tracing::{trace, warn};

/// One line written to stdout.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound<'a> {
    Message { player: &'a PlayerId, text: &'a str },
    Title { player: &'a PlayerId, title: &'a str, subtitle: &'a str },
    Teleport { player: &'a PlayerId, to: &'a Location },
    BossBar { player: &'a PlayerId, boss: Option<&'a str> },
    Reward { player: &'a PlayerId, reward: &'a RewardSpec },
    Spawn { entity: EntityId, kind: &'a str, at: &'a Location },
    Despawn { entity: EntityId },
    Door { at: &'a Location, open: bool },
    Event { event: &'a Event },
    Status { runs: &'a [RunSnapshot] },
}

/// Writes `line` to stdout.
pub fn emit(line: &Outbound<'_>) -> Result<(), CollaboratorError> {
    let json =
        serde_json::to_string(line).map_err(|e| CollaboratorError::new("stdout", e.to_string()))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").map_err(|e| CollaboratorError::new("stdout", e.to_string()))?;
    stdout
        .flush()
        .map_err(|e| CollaboratorError::new("stdout", e.to_string()))
}

/// Hands out entity ids and reports spawns to the driver.
#[derive(Debug, Default)]
pub struct HostWorld {
    next: AtomicU64,
}

impl World for HostWorld {
    fn spawn_entity(&self, kind: &str, at: &Location) -> Option<EntityId> {
        let entity = EntityId(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        match emit(&Outbound::Spawn { entity, kind, at }) {
            Ok(()) => Some(entity),
            Err(error) => {
                warn!(target: "server::host", %error, kind, "Spawn not delivered");
                None
            }
        }
    }

    fn despawn_entity(&self, entity: EntityId) {
        if let Err(error) = emit(&Outbound::Despawn { entity }) {
            warn!(target: "server::host", %error, %entity, "Despawn not delivered");
        }
    }

    fn set_door(&self, door: &Door, open: bool) {
        if let Err(error) = emit(&Outbound::Door {
            at: &door.location,
            open,
        }) {
            warn!(target: "server::host", %error, "Door update not delivered");
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryInventory {
    items: Mutex<HashMap<(PlayerId, String), u32>>,
}

impl ShardInventory for MemoryInventory {
    fn count(&self, player: &PlayerId, item_id: &str) -> u32 {
        let Ok(items) = self.items.lock() else {
            return 0;
        };
        items
            .get(&(player.clone(), item_id.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    fn remove(&self, player: &PlayerId, item_id: &str, amount: u32) -> bool {
        let Ok(mut items) = self.items.lock() else {
            return false;
        };
        match items.get_mut(&(player.clone(), item_id.to_owned())) {
            Some(held) if *held >= amount => {
                *held -= amount;
                trace!(target: "server::host", %player, item_id, amount, "Shard taken");
                true
            }
            _ => false,
        }
    }

    fn give(&self, player: &PlayerId, item_id: &str, amount: u32) -> bool {
        let Ok(mut items) = self.items.lock() else {
            return false;
        };
        *items
            .entry((player.clone(), item_id.to_owned()))
            .or_default() += amount;
        trace!(target: "server::host", %player, item_id, amount, "Shard given");
        true
    }
}

/// Messenger and reward granter writing to stdout.
#[derive(Debug, Default)]
pub struct StdoutHost;

impl Messenger for StdoutHost {
    fn send_message(&self, player: &PlayerId, text: &str) -> Result<(), CollaboratorError> {
        emit(&Outbound::Message { player, text })
    }

    fn send_title(
        &self,
        player: &PlayerId,
        title: &str,
        subtitle: &str,
    ) -> Result<(), CollaboratorError> {
        emit(&Outbound::Title {
            player,
            title,
            subtitle,
        })
    }

    fn teleport(&self, player: &PlayerId, to: &Location) -> Result<(), CollaboratorError> {
        emit(&Outbound::Teleport { player, to })
    }

    fn show_boss_bar(&self, player: &PlayerId, boss: &str) -> Result<(), CollaboratorError> {
        emit(&Outbound::BossBar {
            player,
            boss: Some(boss),
        })
    }

    fn hide_boss_bar(&self, player: &PlayerId) -> Result<(), CollaboratorError> {
        emit(&Outbound::BossBar { player, boss: None })
    }
}

impl RewardGranter for StdoutHost {
    fn grant_reward(&self, player: &PlayerId, reward: &RewardSpec) -> Result<(), CollaboratorError> {
        emit(&Outbound::Reward { player, reward })
    }
}
