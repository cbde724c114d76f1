//! Creation, lookup and teardown of dungeon runs.
//!
//! The registry owns three indexes: templates by name, runs by id and runs by
//! member. Lock order is `players -> run`; a run lock is never held while a
//! registry map lock is acquired.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dungeon_core::{
    DungeonError, DungeonRun, DungeonTemplate, JoinOutcome, PlayerId, RunId, RunState, World,
};
use tracing::{debug, info};

use crate::api::{Result, RuntimeError};
use crate::events::{EventBus, RunEvent};

/// Shared handle to one run. All transitions of the run go through its lock.
pub type RunHandle = Arc<Mutex<DungeonRun>>;

/// Locks a run, mapping poisoning to [`RuntimeError::LockPoisoned`].
pub fn lock_run(run: &RunHandle) -> Result<MutexGuard<'_, DungeonRun>> {
    run.lock().map_err(|_| RuntimeError::LockPoisoned("run"))
}

struct Slot {
    seq: u64,
    dungeon: String,
    run: RunHandle,
}

/// A member left a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Departure {
    pub run: RunId,
    pub dungeon: String,
    /// The run had no members left and was closed.
    pub emptied: bool,
}

pub struct InstanceRegistry {
    templates: RwLock<HashMap<String, Arc<DungeonTemplate>>>,
    runs: RwLock<HashMap<RunId, Slot>>,
    players: RwLock<HashMap<PlayerId, RunId>>,
    counter: AtomicU64,
    max_instances: usize,
    world: Arc<dyn World>,
    bus: EventBus,
}

impl InstanceRegistry {
    pub fn new(max_instances: usize, world: Arc<dyn World>, bus: EventBus) -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            runs: RwLock::new(HashMap::new()),
            players: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
            max_instances,
            world,
            bus,
        }
    }

    fn templates_read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Arc<DungeonTemplate>>>> {
        self.templates
            .read()
            .map_err(|_| RuntimeError::LockPoisoned("templates"))
    }

    fn runs_read(&self) -> Result<RwLockReadGuard<'_, HashMap<RunId, Slot>>> {
        self.runs.read().map_err(|_| RuntimeError::LockPoisoned("runs"))
    }

    fn runs_write(&self) -> Result<RwLockWriteGuard<'_, HashMap<RunId, Slot>>> {
        self.runs.write().map_err(|_| RuntimeError::LockPoisoned("runs"))
    }

    fn players_read(&self) -> Result<RwLockReadGuard<'_, HashMap<PlayerId, RunId>>> {
        self.players
            .read()
            .map_err(|_| RuntimeError::LockPoisoned("players"))
    }

    fn players_write(&self) -> Result<RwLockWriteGuard<'_, HashMap<PlayerId, RunId>>> {
        self.players
            .write()
            .map_err(|_| RuntimeError::LockPoisoned("players"))
    }

    /// Replaces the template table.
    ///
    /// Live runs keep the template they were created with. Returns the names
    /// that are no longer registered.
    pub fn reload_templates(&self, templates: Vec<DungeonTemplate>) -> Result<Vec<String>> {
        let fresh: HashMap<String, Arc<DungeonTemplate>> = templates
            .into_iter()
            .map(|template| (template.name.clone(), Arc::new(template)))
            .collect();

        let mut table = self
            .templates
            .write()
            .map_err(|_| RuntimeError::LockPoisoned("templates"))?;
        let mut removed: Vec<String> = table
            .keys()
            .filter(|name| !fresh.contains_key(*name))
            .cloned()
            .collect();
        removed.sort();
        *table = fresh;
        info!(target: "runtime::registry", templates = table.len(), removed = removed.len(), "Templates reloaded");
        Ok(removed)
    }

    pub fn template(&self, dungeon: &str) -> Result<Option<Arc<DungeonTemplate>>> {
        Ok(self.templates_read()?.get(dungeon).cloned())
    }

    /// Registered template names, sorted.
    pub fn template_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.templates_read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Allocates a new `Waiting` run for `dungeon`.
    pub fn create(&self, dungeon: &str) -> Result<RunHandle> {
        let template = self
            .template(dungeon)?
            .ok_or_else(|| DungeonError::UnknownTemplate(dungeon.to_owned()))?;

        let mut runs = self.runs_write()?;
        if runs.len() >= self.max_instances {
            return Err(DungeonError::InstanceLimitReached {
                limit: self.max_instances,
            }
            .into());
        }
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let id = RunId::new(dungeon, seq);
        let run = Arc::new(Mutex::new(DungeonRun::new(id.clone(), template)));
        runs.insert(
            id.clone(),
            Slot {
                seq,
                dungeon: dungeon.to_owned(),
                run: Arc::clone(&run),
            },
        );
        drop(runs);

        info!(target: "runtime::registry", run = %id, dungeon, "Run created");
        self.bus.publish(RunEvent::RunCreated {
            run: id,
            dungeon: dungeon.to_owned(),
        });
        Ok(run)
    }

    pub fn get(&self, run: &RunId) -> Result<Option<RunHandle>> {
        Ok(self.runs_read()?.get(run).map(|slot| Arc::clone(&slot.run)))
    }

    /// First joinable run of `dungeon` (not full, still `Waiting`), or a new one.
    pub fn get_or_create(&self, dungeon: &str) -> Result<RunHandle> {
        for run in self.for_dungeon(dungeon)? {
            let joinable = {
                let guard = lock_run(&run)?;
                !guard.is_full() && guard.state() == RunState::Waiting
            };
            if joinable {
                return Ok(run);
            }
        }
        self.create(dungeon)
    }

    /// Every live run of `dungeon`, oldest first.
    pub fn for_dungeon(&self, dungeon: &str) -> Result<Vec<RunHandle>> {
        let runs = self.runs_read()?;
        let mut slots: Vec<&Slot> = runs
            .values()
            .filter(|slot| slot.dungeon == dungeon)
            .collect();
        slots.sort_by_key(|slot| slot.seq);
        Ok(slots.into_iter().map(|slot| Arc::clone(&slot.run)).collect())
    }

    /// Every live run, oldest first.
    pub fn all(&self) -> Result<Vec<RunHandle>> {
        let runs = self.runs_read()?;
        let mut slots: Vec<&Slot> = runs.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        Ok(slots.into_iter().map(|slot| Arc::clone(&slot.run)).collect())
    }

    /// Live runs.
    pub fn len(&self) -> Result<usize> {
        Ok(self.runs_read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn player_run(&self, player: &PlayerId) -> Result<Option<RunId>> {
        Ok(self.players_read()?.get(player).cloned())
    }

    /// Run handle of the player's current run.
    pub fn player_run_handle(&self, player: &PlayerId) -> Result<Option<RunHandle>> {
        match self.player_run(player)? {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Adds `player` to `run`, enforcing capacity and single membership.
    ///
    /// Joining a run the player already belongs to is a no-op.
    pub fn admit(&self, run: &RunHandle, player: &PlayerId) -> Result<JoinOutcome> {
        let mut players = self.players_write()?;
        let mut guard = lock_run(run)?;
        let id = guard.id().clone();

        if guard.is_closed() {
            return Err(DungeonError::UnknownRun(id).into());
        }
        if let Some(current) = players.get(player)
            && *current != id
        {
            return Err(DungeonError::AlreadyInRun {
                player: player.clone(),
                run: current.clone(),
            }
            .into());
        }
        if guard.has_member(player) {
            return Ok(JoinOutcome {
                added: false,
                started: false,
            });
        }
        if guard.is_full() {
            return Err(DungeonError::InstanceFull {
                run: id,
                max: guard.template().max_players,
            }
            .into());
        }

        let outcome = guard.add_player(player.clone());
        players.insert(player.clone(), id.clone());
        drop(guard);
        drop(players);

        info!(target: "runtime::registry", run = %id, %player, "Player joined run");
        self.bus.publish(RunEvent::PlayerJoined {
            run: id.clone(),
            player: player.clone(),
        });
        if outcome.started {
            self.bus.publish(RunEvent::RunStarted { run: id });
        }
        Ok(outcome)
    }

    /// Removes `player` from their run and closes the run once it is empty.
    ///
    /// The run is closed under the same lock that saw it empty, so a
    /// concurrent [`admit`](Self::admit) either lands first and keeps the run
    /// alive or finds it closed.
    pub fn remove_player(&self, player: &PlayerId) -> Result<Option<Departure>> {
        let Some(id) = self.players_write()?.remove(player) else {
            return Ok(None);
        };
        let Some(run) = self.get(&id)? else {
            return Ok(None);
        };

        let (dungeon, emptied) = {
            let mut guard = lock_run(&run)?;
            guard.remove_player(player);
            let emptied = guard.is_empty();
            if emptied && !guard.is_closed() {
                self.shut(&id, &mut guard);
            }
            (guard.dungeon().to_owned(), emptied)
        };
        info!(target: "runtime::registry", run = %id, %player, "Player left run");
        self.bus.publish(RunEvent::PlayerLeft {
            run: id.clone(),
            player: player.clone(),
        });

        if emptied && self.runs_write()?.remove(&id).is_some() {
            self.forget(&id, &[])?;
        }
        Ok(Some(Departure {
            run: id,
            dungeon,
            emptied,
        }))
    }

    /// Removes a run from every index, resets it and marks it `Closed`.
    ///
    /// Returns false if the run was not registered.
    pub fn close(&self, id: &RunId) -> Result<bool> {
        let Some(slot) = self.runs_write()?.remove(id) else {
            return Ok(false);
        };

        let members = {
            let mut run = lock_run(&slot.run)?;
            self.shut(id, &mut run);
            run.members()
        };
        self.forget(id, &members)?;
        Ok(true)
    }

    fn shut(&self, id: &RunId, run: &mut DungeonRun) {
        if let Err(err) = run.reset(self.world.as_ref()) {
            debug!(target: "runtime::registry", run = %id, %err, "Run already reset");
        }
        run.close();
    }

    /// Drops the member index entries of a closed run and announces it.
    fn forget(&self, id: &RunId, members: &[PlayerId]) -> Result<()> {
        let mut players = self.players_write()?;
        for member in members {
            if players.get(member) == Some(id) {
                players.remove(member);
            }
        }
        drop(players);

        info!(target: "runtime::registry", run = %id, "Run closed");
        self.bus.publish(RunEvent::RunClosed { run: id.clone() });
        Ok(())
    }
}
