//! Outbound collaborators of the engine.
//!
//! The engine only ever *notifies* these; it never waits on them and never
//! lets one failing player block the others. [`World`] and
//! [`ShardInventory`] come from `dungeon-core` because the state machines
//! there call them directly.

use std::sync::Arc;

use dungeon_core::{Location, PlayerId, RewardSpec, ShardInventory, World};
use tracing::warn;

use super::errors::CollaboratorError;

/// Player-facing notifications and movement.
pub trait Messenger: Send + Sync {
    fn send_message(&self, player: &PlayerId, text: &str) -> Result<(), CollaboratorError>;

    fn send_title(
        &self,
        player: &PlayerId,
        title: &str,
        subtitle: &str,
    ) -> Result<(), CollaboratorError>;

    fn teleport(&self, player: &PlayerId, to: &Location) -> Result<(), CollaboratorError>;

    fn show_boss_bar(&self, player: &PlayerId, boss: &str) -> Result<(), CollaboratorError>;

    fn hide_boss_bar(&self, player: &PlayerId) -> Result<(), CollaboratorError>;
}

/// Hands out victory rewards.
pub trait RewardGranter: Send + Sync {
    fn grant_reward(&self, player: &PlayerId, reward: &RewardSpec) -> Result<(), CollaboratorError>;
}

/// Every collaborator the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub world: Arc<dyn World>,
    pub inventory: Arc<dyn ShardInventory>,
    pub messenger: Arc<dyn Messenger>,
    pub rewards: Arc<dyn RewardGranter>,
}

impl Collaborators {
    pub fn message(&self, player: &PlayerId, text: &str) {
        deliver("message", player, self.messenger.send_message(player, text));
    }

    pub fn message_all(&self, players: &[PlayerId], text: &str) {
        for player in players {
            self.message(player, text);
        }
    }

    pub fn title_all(&self, players: &[PlayerId], title: &str, subtitle: &str) {
        for player in players {
            deliver("title", player, self.messenger.send_title(player, title, subtitle));
        }
    }

    pub fn teleport(&self, player: &PlayerId, to: &Location) {
        deliver("teleport", player, self.messenger.teleport(player, to));
    }

    pub fn show_boss_bar(&self, players: &[PlayerId], boss: &str) {
        for player in players {
            deliver("boss_bar", player, self.messenger.show_boss_bar(player, boss));
        }
    }

    pub fn hide_boss_bar(&self, players: &[PlayerId]) {
        for player in players {
            deliver("boss_bar", player, self.messenger.hide_boss_bar(player));
        }
    }

    pub fn grant(&self, player: &PlayerId, reward: &RewardSpec) {
        deliver("reward", player, self.rewards.grant_reward(player, reward));
    }
}

/// Logs a failed collaborator call and carries on.
fn deliver(call: &'static str, player: &PlayerId, result: Result<(), CollaboratorError>) {
    if let Err(error) = result {
        warn!(
            target: "runtime::collaborators",
            call,
            %player,
            %error,
            "Collaborator call failed, skipping player"
        );
    }
}
