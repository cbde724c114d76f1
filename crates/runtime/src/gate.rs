//! Portal and shard admission.
//!
//! One [`Portal`] exists per dungeon with a portal location. Interactions are
//! matched to a portal by exact block first, then by the nearest portal
//! within the configured radius.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use dungeon_core::{
    DungeonError, DungeonTemplate, JoinOutcome, Location, Portal, PortalState, PlayerId, RunId,
    ShardDefinition, ShardGate, ShardInventory,
};
use tracing::{debug, info};

use crate::api::{Result, RuntimeError};
use crate::events::{EventBus, PortalEvent};
use crate::registry::{InstanceRegistry, RunHandle, lock_run};

type PortalHandle = Arc<Mutex<Portal>>;

fn lock_portal(portal: &PortalHandle) -> Result<MutexGuard<'_, Portal>> {
    portal
        .lock()
        .map_err(|_| RuntimeError::LockPoisoned("portal"))
}

/// What a successful interaction did.
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    /// A shard opened the portal. Nobody entered yet.
    Activated { dungeon: String },
    /// The player was admitted into a run.
    Entered {
        dungeon: String,
        run: RunId,
        entry: Location,
        outcome: JoinOutcome,
    },
}

pub struct AccessGate {
    portals: RwLock<HashMap<String, PortalHandle>>,
    shards: RwLock<ShardGate>,
    radius: f64,
    bus: EventBus,
}

impl AccessGate {
    pub fn new(radius: f64, bus: EventBus) -> Self {
        Self {
            portals: RwLock::new(HashMap::new()),
            shards: RwLock::new(ShardGate::new()),
            radius,
            bus,
        }
    }

    /// Registers portals and shard rules for `templates`, dropping those of
    /// dungeons that disappeared. Portals whose location did not change keep
    /// their state.
    pub fn reload(&self, templates: &[DungeonTemplate]) -> Result<()> {
        {
            let mut shards = self
                .shards
                .write()
                .map_err(|_| RuntimeError::LockPoisoned("shards"))?;
            shards.clear();
            for template in templates {
                shards.register(&template.name, template.shard);
            }
        }

        let mut portals = self
            .portals
            .write()
            .map_err(|_| RuntimeError::LockPoisoned("portals"))?;
        let mut fresh = HashMap::new();
        for template in templates {
            let Some(location) = &template.portal_location else {
                continue;
            };
            let kept = match portals.remove(&template.name) {
                Some(existing) if lock_portal(&existing)?.location() == location => existing,
                _ => Arc::new(Mutex::new(Portal::new(&template.name, location.clone()))),
            };
            fresh.insert(template.name.clone(), kept);
        }
        *portals = fresh;
        info!(target: "runtime::gate", portals = portals.len(), "Portals registered");
        Ok(())
    }

    fn portal(&self, dungeon: &str) -> Result<Option<PortalHandle>> {
        Ok(self
            .portals
            .read()
            .map_err(|_| RuntimeError::LockPoisoned("portals"))?
            .get(dungeon)
            .cloned())
    }

    /// Portal matched by an interaction at `location`.
    pub fn portal_at(&self, location: &Location) -> Result<Option<String>> {
        let portals = self
            .portals
            .read()
            .map_err(|_| RuntimeError::LockPoisoned("portals"))?;

        let mut nearest: Option<(f64, &String)> = None;
        for (dungeon, handle) in portals.iter() {
            let portal = lock_portal(handle)?;
            if portal.location().same_block(location) {
                return Ok(Some(dungeon.clone()));
            }
            let distance = portal.distance(location);
            if distance <= self.radius && nearest.is_none_or(|(best, _)| distance < best) {
                nearest = Some((distance, dungeon));
            }
        }
        Ok(nearest.map(|(_, dungeon)| dungeon.clone()))
    }

    pub fn portal_state(&self, dungeon: &str) -> Result<Option<PortalState>> {
        match self.portal(dungeon)? {
            Some(handle) => Ok(Some(lock_portal(&handle)?.state())),
            None => Ok(None),
        }
    }

    /// Copy of a portal for commands and HUDs.
    pub fn portal_snapshot(&self, dungeon: &str) -> Result<Option<Portal>> {
        match self.portal(dungeon)? {
            Some(handle) => Ok(Some(lock_portal(&handle)?.clone())),
            None => Ok(None),
        }
    }

    /// Handles a player using the portal at `location`.
    pub fn interact(
        &self,
        player: &PlayerId,
        location: &Location,
        registry: &InstanceRegistry,
        inventory: &dyn ShardInventory,
    ) -> Result<Admission> {
        let dungeon = self
            .portal_at(location)?
            .ok_or_else(|| DungeonError::UnknownPortal(location.to_string()))?;
        let handle = self
            .portal(&dungeon)?
            .ok_or_else(|| DungeonError::UnknownPortal(dungeon.clone()))?;
        let mut portal = lock_portal(&handle)?;

        match portal.state() {
            PortalState::Inactive => {
                self.unlock(&mut portal, player, inventory)?;
                Ok(Admission::Activated { dungeon })
            }
            PortalState::Closing => Err(DungeonError::PortalClosing(dungeon).into()),
            PortalState::Active => {
                let mut run = self.bound_or_new_run(&mut portal, registry)?;
                let outcome = match registry.admit(&run, player) {
                    Err(error) if matches!(error.dungeon(), Some(DungeonError::UnknownRun(_))) => {
                        // The bound run emptied and closed after it was picked.
                        debug!(target: "runtime::gate", %player, %error, "Rebinding portal");
                        portal.unbind();
                        run = self.bound_or_new_run(&mut portal, registry)?;
                        registry.admit(&run, player)?
                    }
                    other => other?,
                };
                let (id, entry) = {
                    let guard = lock_run(&run)?;
                    (guard.id().clone(), guard.template().entry_point.clone())
                };
                debug!(target: "runtime::gate", %player, run = %id, "Player admitted through portal");
                Ok(Admission::Entered {
                    dungeon,
                    run: id,
                    entry,
                    outcome,
                })
            }
        }
    }

    fn unlock(
        &self,
        portal: &mut Portal,
        player: &PlayerId,
        inventory: &dyn ShardInventory,
    ) -> Result<()> {
        let shards = self
            .shards
            .read()
            .map_err(|_| RuntimeError::LockPoisoned("shards"))?;
        let missing = || DungeonError::MissingAccessToken {
            player: player.clone(),
            dungeon: portal.dungeon().to_owned(),
        };
        if !shards.has_required(player, portal.dungeon(), inventory) {
            return Err(missing().into());
        }
        if !shards.consume(player, portal.dungeon(), inventory) {
            return Err(missing().into());
        }
        portal.activate()?;
        info!(target: "runtime::gate", dungeon = portal.dungeon(), %player, "Portal activated");
        self.publish_state(portal);
        Ok(())
    }

    /// Run served by an active portal, binding a fresh one when needed.
    fn bound_or_new_run(&self, portal: &mut Portal, registry: &InstanceRegistry) -> Result<RunHandle> {
        if let Some(bound) = portal.bound_run().cloned()
            && let Some(run) = registry.get(&bound)?
        {
            let closed = lock_run(&run)?.is_closed();
            if !closed {
                return Ok(run);
            }
        }
        let run = registry.get_or_create(portal.dungeon())?;
        let id = lock_run(&run)?.id().clone();
        debug!(target: "runtime::gate", dungeon = portal.dungeon(), run = %id, "Portal bound to run");
        portal.bind(id);
        Ok(run)
    }

    /// `Active -> Closing` after a victory.
    pub fn close_portal(&self, dungeon: &str) -> Result<bool> {
        self.update(dungeon, Portal::close)
    }

    /// Any state `-> Inactive`.
    pub fn deactivate(&self, dungeon: &str) -> Result<bool> {
        self.update(dungeon, Portal::deactivate)
    }

    /// Lets go of `run` unless the portal serves a different run.
    ///
    /// A closing portal is deactivated since its countdown will never end;
    /// an active one just forgets the binding and rebinds on the next entry.
    pub fn release(&self, dungeon: &str, run: &RunId) -> Result<()> {
        let Some(handle) = self.portal(dungeon)? else {
            return Ok(());
        };
        let mut portal = lock_portal(&handle)?;
        if portal.bound_run().is_some_and(|bound| bound != run) {
            return Ok(());
        }
        if portal.state() == PortalState::Closing {
            portal.deactivate();
            self.publish_state(&portal);
        } else {
            portal.unbind();
        }
        Ok(())
    }

    fn update(&self, dungeon: &str, transition: fn(&mut Portal) -> bool) -> Result<bool> {
        let Some(handle) = self.portal(dungeon)? else {
            return Ok(false);
        };
        let mut portal = lock_portal(&handle)?;
        let changed = transition(&mut portal);
        if changed {
            info!(target: "runtime::gate", dungeon, state = %portal.state(), "Portal state changed");
            self.publish_state(&portal);
        }
        Ok(changed)
    }

    fn publish_state(&self, portal: &Portal) {
        self.bus.publish(PortalEvent::PortalStateChanged {
            dungeon: portal.dungeon().to_owned(),
            state: portal.state(),
        });
    }

    pub fn shard_definition(&self, dungeon: &str) -> Result<Option<ShardDefinition>> {
        Ok(self
            .shards
            .read()
            .map_err(|_| RuntimeError::LockPoisoned("shards"))?
            .definition(dungeon)
            .cloned())
    }

    /// Hands shards to a player through the inventory collaborator.
    pub fn give_shard(
        &self,
        player: &PlayerId,
        dungeon: &str,
        amount: u32,
        inventory: &dyn ShardInventory,
    ) -> Result<bool> {
        let shards = self
            .shards
            .read()
            .map_err(|_| RuntimeError::LockPoisoned("shards"))?;
        if shards.definition(dungeon).is_none() {
            return Err(DungeonError::UnknownTemplate(dungeon.to_owned()).into());
        }
        Ok(shards.give(player, dungeon, amount, inventory))
    }
}
