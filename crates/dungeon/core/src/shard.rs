//! Access shards that unlock portals.

use std::collections::HashMap;

use crate::ids::PlayerId;
use crate::template::{ShardKind, ShardSpec};
use crate::world::ShardInventory;

/// Highest tier a tiered shard can carry.
pub const MAX_TIER: u8 = 10;

/// Access rule of one dungeon.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShardDefinition {
    pub dungeon: String,
    pub kind: ShardKind,
    pub tier: u8,
}

impl ShardDefinition {
    pub fn new(dungeon: impl Into<String>, spec: ShardSpec) -> Self {
        Self {
            dungeon: dungeon.into(),
            kind: spec.kind,
            tier: spec.tier,
        }
    }

    /// Inventory item id of the required shard.
    pub fn item_id(&self) -> String {
        self.item_id_for_tier(self.tier)
    }

    fn item_id_for_tier(&self, tier: u8) -> String {
        match self.kind {
            ShardKind::Tiered => format!("{}_shard_t{}", self.dungeon, tier),
            ShardKind::Consumable | ShardKind::Reusable => format!("{}_shard", self.dungeon),
        }
    }

    pub fn display_name(&self) -> String {
        format!("Shard of {}", self.dungeon.replace('_', " "))
    }

    pub fn is_consumable(&self) -> bool {
        self.kind == ShardKind::Consumable
    }

    /// Item ids that satisfy this rule, lowest tier first.
    fn accepted_items(&self) -> Vec<String> {
        match self.kind {
            ShardKind::Tiered => (self.tier..=MAX_TIER.max(self.tier))
                .map(|tier| self.item_id_for_tier(tier))
                .collect(),
            ShardKind::Consumable | ShardKind::Reusable => vec![self.item_id()],
        }
    }
}

/// Shard rules keyed by dungeon name.
#[derive(Clone, Debug, Default)]
pub struct ShardGate {
    definitions: HashMap<String, ShardDefinition>,
}

impl ShardGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dungeon: &str, spec: ShardSpec) {
        self.definitions
            .insert(dungeon.to_owned(), ShardDefinition::new(dungeon, spec));
    }

    pub fn unregister(&mut self, dungeon: &str) -> Option<ShardDefinition> {
        self.definitions.remove(dungeon)
    }

    pub fn definition(&self, dungeon: &str) -> Option<&ShardDefinition> {
        self.definitions.get(dungeon)
    }

    pub fn clear(&mut self) {
        self.definitions.clear();
    }

    /// Whether `player` holds a shard that opens `dungeon`.
    ///
    /// A dungeon without a registered rule needs no shard.
    pub fn has_required(&self, player: &PlayerId, dungeon: &str, inventory: &dyn ShardInventory) -> bool {
        let Some(definition) = self.definitions.get(dungeon) else {
            return true;
        };
        definition
            .accepted_items()
            .iter()
            .any(|item| inventory.count(player, item) > 0)
    }

    /// Takes the shard cost. Only consumable shards cost anything.
    pub fn consume(&self, player: &PlayerId, dungeon: &str, inventory: &dyn ShardInventory) -> bool {
        match self.definitions.get(dungeon) {
            Some(definition) if definition.is_consumable() => {
                inventory.remove(player, &definition.item_id(), 1)
            }
            _ => true,
        }
    }

    /// Hands `amount` shards of `dungeon` to `player`.
    pub fn give(
        &self,
        player: &PlayerId,
        dungeon: &str,
        amount: u32,
        inventory: &dyn ShardInventory,
    ) -> bool {
        match self.definitions.get(dungeon) {
            Some(definition) => inventory.give(player, &definition.item_id(), amount),
            None => false,
        }
    }
}
