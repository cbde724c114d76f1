//! The aggregate of one playthrough.
//!
//! A [`DungeonRun`] owns its rooms, boss encounter and enemy bindings, so a
//! single lock around the run serialises every transition of that run.
//! Transitions are guarded by the stored state and are safe to repeat: the
//! second attempt returns [`DungeonError::AlreadyProcessed`] and changes
//! nothing.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::boss::BossEncounter;
use crate::encounter::EncounterTracker;
use crate::error::{DungeonError, Result, Transition};
use crate::ids::{EntityId, PlayerId, RoomId, RunId};
use crate::location::Location;
use crate::room::{ClearOutcome, RoomSequencer, RoomState};
use crate::template::DungeonTemplate;
use crate::world::World;

/// Overall lifecycle of a run.
///
/// States only move forward in declaration order. `Active`, `InProgress`
/// and `BossFight` all count as "running".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Created, not enough players yet.
    Waiting,
    /// Enough players joined; no room entered yet.
    Active,
    /// At least one room was activated.
    InProgress,
    /// The boss is up.
    BossFight,
    /// Victory processed; countdown running.
    Completing,
    /// Players are being sent out and the instance is reset.
    Resetting,
    /// Terminal.
    Closed,
}

impl RunState {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active | Self::InProgress | Self::BossFight)
    }

    /// True once the run can no longer be won.
    pub const fn is_finishing(self) -> bool {
        matches!(self, Self::Completing | Self::Resetting | Self::Closed)
    }
}

/// Result of [`DungeonRun::add_player`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The player was not a member before.
    pub added: bool,
    /// This join moved the run from `Waiting` to `Active`.
    pub started: bool,
}

/// Result of activating a room through the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomActivation {
    pub room: RoomId,
    pub spawned: Vec<EntityId>,
    /// Set when the room had nothing to fight and cleared immediately.
    pub cleared: Option<ClearOutcome>,
    /// The boss room opened as a consequence.
    pub boss_unlocked: bool,
}

/// What an entity death meant for the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeathOutcome {
    /// An ordinary enemy died.
    Enemy {
        room: RoomId,
        remaining: usize,
        cleared: Option<ClearOutcome>,
        boss_unlocked: bool,
    },
    /// The boss died. Victory still has to be processed by the caller.
    Boss { entity: EntityId },
}

/// Read-only copy of a run for HUDs and commands.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSnapshot {
    pub id: RunId,
    pub dungeon: String,
    pub state: RunState,
    pub members: Vec<PlayerId>,
    pub elapsed_secs: u64,
    pub current_room: usize,
    pub cleared_rooms: usize,
    pub total_rooms: usize,
    pub remaining_enemies: usize,
    pub boss_alive: bool,
    pub boss_defeated: bool,
    pub countdown: Option<u32>,
}

#[derive(Debug)]
pub struct DungeonRun {
    id: RunId,
    template: Arc<DungeonTemplate>,
    members: BTreeSet<PlayerId>,
    state: RunState,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    rooms: RoomSequencer,
    boss: Option<BossEncounter>,
    tracker: EncounterTracker,
    victory_processed: bool,
}

impl DungeonRun {
    pub fn new(id: RunId, template: Arc<DungeonTemplate>) -> Self {
        let rooms = RoomSequencer::new(&template.rooms);
        let mut boss = template.boss.as_ref().map(BossEncounter::from_config);
        if rooms.all_cleared()
            && let Some(boss) = &mut boss
        {
            boss.unlock();
        }
        Self {
            id,
            template,
            members: BTreeSet::new(),
            state: RunState::Waiting,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            rooms,
            boss,
            tracker: EncounterTracker::new(),
            victory_processed: false,
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn template(&self) -> &Arc<DungeonTemplate> {
        &self.template
    }

    pub fn dungeon(&self) -> &str {
        &self.template.name
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_closed(&self) -> bool {
        self.state == RunState::Closed
    }

    pub fn victory_processed(&self) -> bool {
        self.victory_processed
    }

    /// Copy of the member set in a stable order.
    pub fn members(&self) -> Vec<PlayerId> {
        self.members.iter().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn has_member(&self, player: &PlayerId) -> bool {
        self.members.contains(player)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.template.max_players as usize
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn rooms(&self) -> &RoomSequencer {
        &self.rooms
    }

    pub fn boss(&self) -> Option<&BossEncounter> {
        self.boss.as_ref()
    }

    pub fn tracker(&self) -> &EncounterTracker {
        &self.tracker
    }

    /// Adds a member. Capacity is the caller's concern.
    pub fn add_player(&mut self, player: PlayerId) -> JoinOutcome {
        let added = self.members.insert(player);
        let started = self.state == RunState::Waiting
            && self.members.len() >= self.template.min_players as usize;
        if started {
            self.state = RunState::Active;
            self.started_at = Some(Utc::now());
            info!(target: "core::run", run = %self.id, members = self.members.len(), "Run started");
        }
        JoinOutcome { added, started }
    }

    /// Removes a member; never changes the run state.
    pub fn remove_player(&mut self, player: &PlayerId) -> bool {
        self.members.remove(player)
    }

    /// Activates `room` and spawns its enemies.
    pub fn activate_room(&mut self, room: &str, world: &dyn World) -> Result<RoomActivation> {
        let outcome = self.rooms.activate(room, &mut self.tracker, world)?;
        if self.state == RunState::Active {
            self.state = RunState::InProgress;
        }
        let boss_unlocked = match &outcome.cleared {
            Some(cleared) => self.after_clear(cleared),
            None => false,
        };
        Ok(RoomActivation {
            room: room.to_owned(),
            spawned: outcome.spawned,
            cleared: outcome.cleared,
            boss_unlocked,
        })
    }

    /// Force-clears a room, despawning whatever is still alive in it.
    pub fn clear_room(&mut self, room: &str, world: &dyn World) -> Result<(ClearOutcome, bool)> {
        let outcome = self.rooms.clear(room, &mut self.tracker, world)?;
        let boss_unlocked = self.after_clear(&outcome);
        Ok((outcome, boss_unlocked))
    }

    fn after_clear(&mut self, outcome: &ClearOutcome) -> bool {
        if !outcome.all_cleared {
            return false;
        }
        self.boss.as_mut().is_some_and(BossEncounter::unlock)
    }

    /// Rooms the move `from -> to` walks into that are waiting for players.
    pub fn rooms_entered(&self, from: &Location, to: &Location) -> Vec<RoomId> {
        self.rooms
            .entered(from, to)
            .filter(|room| room.state() == RoomState::Unlocked)
            .map(|room| room.id().to_owned())
            .collect()
    }

    /// Whether the move walks into a boss room that should spawn on entry.
    pub fn boss_room_entered(&self, from: &Location, to: &Location) -> bool {
        self.boss.as_ref().is_some_and(|boss| {
            boss.spawn_on_entry()
                && boss.state() == RoomState::Unlocked
                && boss.entered(from, to)
        })
    }

    /// Whether an unlocked boss that does not wait for entry still has to be
    /// spawned.
    pub fn boss_due(&self) -> bool {
        self.state.is_active()
            && self.boss.as_ref().is_some_and(|boss| {
                !boss.spawn_on_entry()
                    && boss.state() == RoomState::Unlocked
                    && !boss.is_alive()
                    && !boss.is_defeated()
            })
    }

    /// Spawns the boss.
    ///
    /// `Ok(None)` when the template has no boss or the world refused.
    pub fn spawn_boss(&mut self, world: &dyn World) -> Result<Option<EntityId>> {
        let Some(boss) = self.boss.as_mut() else {
            return Ok(None);
        };
        if boss.state() == RoomState::Locked {
            return Err(DungeonError::RoomLocked(boss.id().to_owned()));
        }
        if boss.is_alive() || boss.is_defeated() {
            return Err(DungeonError::AlreadyProcessed(Transition::SpawnBoss));
        }
        let spawned = boss.spawn(world);
        if spawned.is_some() && matches!(self.state, RunState::Active | RunState::InProgress) {
            self.state = RunState::BossFight;
        }
        Ok(spawned)
    }

    /// Routes a death to the boss first, then to the ordinary rooms.
    pub fn on_entity_death(&mut self, entity: EntityId, world: &dyn World) -> Result<DeathOutcome> {
        if let Some(boss) = &mut self.boss
            && boss.on_death(entity)
        {
            return Ok(DeathOutcome::Boss { entity });
        }

        let room = self.tracker.on_death(entity)?;
        let remaining = self.tracker.remaining(&room);
        debug!(target: "core::run", run = %self.id, %entity, room = %room, remaining, "Enemy died");
        let cleared = self.rooms.clear_if_done(&room, &mut self.tracker, world)?;
        let boss_unlocked = match &cleared {
            Some(outcome) => self.after_clear(outcome),
            None => false,
        };
        Ok(DeathOutcome::Enemy {
            room,
            remaining,
            cleared,
            boss_unlocked,
        })
    }

    /// Whether `entity` is tracked anywhere in this run.
    pub fn tracks(&self, entity: EntityId) -> bool {
        self.tracker.is_tracked(entity) || self.boss.as_ref().is_some_and(|b| b.is_target(entity))
    }

    /// Processes victory at most once.
    pub fn complete(&mut self) -> Result<()> {
        if self.victory_processed || self.state.is_finishing() {
            return Err(DungeonError::AlreadyProcessed(Transition::Victory));
        }
        self.victory_processed = true;
        self.state = RunState::Completing;
        self.completed_at = Some(Utc::now());
        info!(target: "core::run", run = %self.id, elapsed = self.elapsed(), "Run completed");
        Ok(())
    }

    /// Enters `Resetting` and returns rooms, boss and bindings to their
    /// initial layout.
    pub fn reset(&mut self, world: &dyn World) -> Result<()> {
        if matches!(self.state, RunState::Resetting | RunState::Closed) {
            return Err(DungeonError::AlreadyProcessed(Transition::Reset));
        }
        self.state = RunState::Resetting;
        self.rooms.reset(&mut self.tracker, world);
        if let Some(boss) = &mut self.boss {
            boss.reset(world);
            if self.rooms.all_cleared() {
                boss.unlock();
            }
        }
        Ok(())
    }

    /// Terminal transition. Returns false if already closed.
    pub fn close(&mut self) -> bool {
        if self.state == RunState::Closed {
            return false;
        }
        self.state = RunState::Closed;
        info!(target: "core::run", run = %self.id, "Run closed");
        true
    }

    /// Seconds between start and completion, or start and `now`.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        let Some(started) = self.started_at else {
            return 0;
        };
        let end = self.completed_at.unwrap_or(now);
        (end - started).num_seconds().max(0) as u64
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed_at(Utc::now())
    }

    /// A started run ran past its time limit without a victory.
    pub fn is_time_expired(&self, now: DateTime<Utc>) -> bool {
        let limit = u64::from(self.template.time_limit);
        limit > 0
            && self.state.is_active()
            && !self.victory_processed
            && self.elapsed_at(now) > limit
    }

    pub fn snapshot(&self, countdown: Option<u32>) -> RunSnapshot {
        let remaining_enemies = self
            .rooms
            .current_room()
            .map_or(0, |room| self.tracker.remaining(room.id()));
        RunSnapshot {
            id: self.id.clone(),
            dungeon: self.template.name.clone(),
            state: self.state,
            members: self.members(),
            elapsed_secs: self.elapsed(),
            current_room: self.rooms.current_index(),
            cleared_rooms: self.rooms.cleared_count(),
            total_rooms: self.rooms.len(),
            remaining_enemies,
            boss_alive: self.boss.as_ref().is_some_and(BossEncounter::is_alive),
            boss_defeated: self.boss.as_ref().is_some_and(BossEncounter::is_defeated),
            countdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::location::BlockRegion;
    use crate::template::{BossConfig, RoomConfig, SpawnPointConfig};
    use crate::testing::FakeWorld;

    fn loc(x: f64) -> Location {
        Location::new("w", x, 64.0, 0.0)
    }

    fn region(x: f64) -> BlockRegion {
        BlockRegion::from_corners(&Location::new("w", x, 60.0, -5.0), &Location::new("w", x + 9.0, 70.0, 5.0))
    }

    /// Layout of the "crypt" dungeon: three skeletons, an empty hallway, a lich.
    fn crypt() -> Arc<DungeonTemplate> {
        Arc::new(
            DungeonTemplate::new("crypt", loc(0.0), loc(-50.0))
                .with_players(1, 2)
                .with_countdown(5)
                .with_room(
                    RoomConfig::new("room_1", 1, region(10.0))
                        .with_spawn(SpawnPointConfig::new("sp1", loc(12.0), "skeleton", 3)),
                )
                .with_room(RoomConfig::new("room_2", 2, region(20.0)))
                .with_boss(BossConfig::new("lair", region(30.0), "lich", loc(35.0))),
        )
    }

    fn run() -> DungeonRun {
        DungeonRun::new(RunId::new("crypt", 1), crypt())
    }

    #[test]
    fn first_join_reaching_min_starts_run() {
        let mut run = DungeonRun::new(
            RunId::new("crypt", 1),
            Arc::new(DungeonTemplate::new("crypt", loc(0.0), loc(1.0)).with_players(2, 4)),
        );
        assert_eq!(run.state(), RunState::Waiting);

        let alice = run.add_player("alice".into());
        assert!(alice.added && !alice.started);
        assert_eq!(run.state(), RunState::Waiting);

        let bob = run.add_player("bob".into());
        assert!(bob.started);
        assert_eq!(run.state(), RunState::Active);
        let started = run.started_at().unwrap();

        let carol = run.add_player("carol".into());
        assert!(!carol.started);
        assert_eq!(run.started_at(), Some(started));

        let again = run.add_player("bob".into());
        assert!(!again.added);
        assert_eq!(run.member_count(), 3);
    }

    #[test]
    fn remove_player_keeps_state() {
        let mut run = run();
        run.add_player("alice".into());
        assert!(run.remove_player(&"alice".into()));
        assert!(run.is_empty());
        assert_eq!(run.state(), RunState::Active);
    }

    #[test]
    fn deaths_clear_rooms_and_unlock_boss() {
        let world = FakeWorld::default();
        let mut run = run();
        run.add_player("alice".into());

        let activation = run.activate_room("room_1", &world).unwrap();
        assert_eq!(activation.spawned.len(), 3);
        assert_eq!(run.state(), RunState::InProgress);

        let mut last = None;
        for entity in activation.spawned {
            last = Some(run.on_entity_death(entity, &world).unwrap());
        }
        let Some(DeathOutcome::Enemy {
            room,
            remaining,
            cleared: Some(cleared),
            boss_unlocked,
        }) = last
        else {
            panic!("expected the last skeleton to clear the room");
        };
        assert_eq!(room, "room_1");
        assert_eq!(remaining, 0);
        assert_eq!(cleared.cleared, ["room_1", "room_2"]);
        assert!(cleared.all_cleared);
        assert!(boss_unlocked);
        assert_eq!(run.boss().unwrap().state(), RoomState::Unlocked);
    }

    #[test]
    fn boss_death_routes_before_rooms() {
        let world = FakeWorld::default();
        let mut run = run();
        run.add_player("alice".into());
        assert_eq!(
            run.spawn_boss(&world),
            Err(DungeonError::RoomLocked("lair".into()))
        );

        run.clear_room("room_1", &world).unwrap();
        let boss = run.spawn_boss(&world).unwrap().unwrap();
        assert_eq!(run.state(), RunState::BossFight);
        assert_eq!(
            run.spawn_boss(&world),
            Err(DungeonError::AlreadyProcessed(Transition::SpawnBoss))
        );

        assert_eq!(
            run.on_entity_death(boss, &world),
            Ok(DeathOutcome::Boss { entity: boss })
        );
        assert_eq!(
            run.on_entity_death(boss, &world),
            Err(DungeonError::UntrackedEntity(boss))
        );
    }

    #[test]
    fn complete_runs_once() {
        let mut run = run();
        run.add_player("alice".into());
        run.complete().unwrap();
        assert_eq!(run.state(), RunState::Completing);
        assert!(run.completed_at().is_some());
        assert_eq!(
            run.complete(),
            Err(DungeonError::AlreadyProcessed(Transition::Victory))
        );
    }

    #[test]
    fn reset_restores_rooms_boss_and_bindings() {
        let world = FakeWorld::default();
        let mut run = run();
        run.add_player("alice".into());
        run.activate_room("room_1", &world).unwrap();
        run.clear_room("room_1", &world).unwrap();
        let boss = run.spawn_boss(&world).unwrap().unwrap();
        run.complete().unwrap();

        run.reset(&world).unwrap();
        assert_eq!(run.state(), RunState::Resetting);
        let states: Vec<_> = run.rooms().rooms().iter().map(|r| r.state()).collect();
        assert_eq!(states, [RoomState::Unlocked, RoomState::Locked]);
        assert_eq!(run.tracker().binding_count(), 0);
        let encounter = run.boss().unwrap();
        assert!(!encounter.is_defeated());
        assert_eq!(encounter.boss_id(), None);
        assert!(world.despawned().contains(&boss));

        assert!(run.close());
        assert!(!run.close());
        assert_eq!(
            run.reset(&world),
            Err(DungeonError::AlreadyProcessed(Transition::Reset))
        );
    }

    #[test]
    fn states_never_move_backwards() {
        let world = FakeWorld::default();
        let mut run = run();
        let mut seen = vec![run.state()];
        run.add_player("alice".into());
        seen.push(run.state());
        run.activate_room("room_1", &world).unwrap();
        seen.push(run.state());
        run.clear_room("room_1", &world).unwrap();
        run.spawn_boss(&world).unwrap();
        seen.push(run.state());
        run.complete().unwrap();
        seen.push(run.state());
        run.add_player("bob".into());
        seen.push(run.state());
        run.reset(&world).unwrap();
        seen.push(run.state());
        run.close();
        seen.push(run.state());

        let order = |s: &RunState| *s as u8;
        assert!(seen.windows(2).all(|w| order(&w[0]) <= order(&w[1])));
        assert_eq!(seen.last(), Some(&RunState::Closed));
    }

    #[test]
    fn time_limit_expires_only_while_running() {
        let mut run = DungeonRun::new(
            RunId::new("crypt", 1),
            Arc::new(DungeonTemplate::new("crypt", loc(0.0), loc(1.0)).with_time_limit(60)),
        );
        let now = Utc::now();
        assert!(!run.is_time_expired(now + Duration::seconds(3600)));

        run.add_player("alice".into());
        assert!(!run.is_time_expired(now + Duration::seconds(30)));
        assert!(run.is_time_expired(now + Duration::seconds(120)));

        run.complete().unwrap();
        assert!(!run.is_time_expired(now + Duration::seconds(120)));
    }

    #[test]
    fn snapshot_copies_progress() {
        let world = FakeWorld::default();
        let mut run = run();
        run.add_player("alice".into());
        run.activate_room("room_1", &world).unwrap();

        let snapshot = run.snapshot(None);
        assert_eq!(snapshot.dungeon, "crypt");
        assert_eq!(snapshot.state, RunState::InProgress);
        assert_eq!(snapshot.members, [PlayerId::new("alice")]);
        assert_eq!(snapshot.current_room, 0);
        assert_eq!(snapshot.total_rooms, 2);
        assert_eq!(snapshot.remaining_enemies, 3);
        assert!(!snapshot.boss_alive);
    }

    #[test]
    fn bossless_template_without_rooms_unlocks_nothing() {
        let run = DungeonRun::new(
            RunId::new("empty", 1),
            Arc::new(DungeonTemplate::new("empty", loc(0.0), loc(1.0))),
        );
        assert!(run.boss().is_none());
        assert!(run.rooms().all_cleared());
    }

    #[test]
    fn roomless_run_owes_a_boss_that_skips_the_entry_trigger() {
        let boss = BossConfig {
            spawn_on_entry: false,
            ..BossConfig::new("lair", region(30.0), "lich", loc(35.0))
        };
        let mut run = DungeonRun::new(
            RunId::new("lair", 1),
            Arc::new(DungeonTemplate::new("lair", loc(0.0), loc(-50.0)).with_boss(boss)),
        );
        let world = FakeWorld::default();

        assert!(!run.boss_due());
        assert!(run.add_player(PlayerId::new("alice")).started);
        assert!(run.boss_due());

        assert!(run.spawn_boss(&world).unwrap().is_some());
        assert_eq!(run.state(), RunState::BossFight);
        assert!(!run.boss_due());
    }

    #[test]
    fn entry_triggered_boss_is_never_due() {
        let mut run = run();
        let world = FakeWorld::default();
        run.add_player(PlayerId::new("alice"));
        for entity in run.activate_room("room_1", &world).unwrap().spawned {
            run.on_entity_death(entity, &world).unwrap();
        }
        run.activate_room("room_2", &world).unwrap();
        assert_eq!(run.boss().map(BossEncounter::state), Some(RoomState::Unlocked));
        assert!(!run.boss_due());
    }
}
