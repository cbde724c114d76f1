//! Handlers for host game events.
//!
//! Each handler reacts to one kind of [`GameEvent`] and drives the registry,
//! gate and completion pipeline through the [`EngineContext`]. The engine
//! dispatches every event to every handler; handlers ignore what is not
//! theirs.

mod death;
mod movement;
mod portal;
mod quit;

pub use death::DeathHandler;
pub use movement::MovementHandler;
pub use portal::PortalHandler;
pub use quit::QuitHandler;

use dungeon_core::{ClearOutcome, PlayerId, RunId};
use tracing::{debug, info, warn};

use crate::api::Result;
use crate::context::EngineContext;
use crate::events::{BossEvent, GameEvent, RoomEvent};
use crate::registry::{RunHandle, lock_run};

/// Criticality level for handler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerCriticality {
    /// Handler failure is returned to the caller of the dispatch.
    Critical,
    /// Handler failure is logged but dispatch continues.
    Important,
    /// Handler failure can be ignored.
    Optional,
}

/// Reacts to host game events.
pub trait GameEventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Important
    }

    fn handle(&self, event: &GameEvent, ctx: &EngineContext<'_>) -> Result<()>;
}

/// The four handlers every engine runs.
pub fn default_handlers() -> Vec<Box<dyn GameEventHandler>> {
    vec![
        Box::new(DeathHandler),
        Box::new(MovementHandler),
        Box::new(PortalHandler),
        Box::new(QuitHandler),
    ]
}

/// Publishes and announces a room clear, including rooms it cascaded into.
fn announce_clear(
    ctx: &EngineContext<'_>,
    run: &RunId,
    members: &[PlayerId],
    outcome: &ClearOutcome,
    boss_unlocked: bool,
) {
    for room in &outcome.cleared {
        info!(target: "runtime::handlers", %run, %room, "Room cleared");
        ctx.bus.publish(RoomEvent::RoomCleared {
            run: run.clone(),
            room: room.clone(),
        });
    }
    if !outcome.cleared.is_empty() {
        ctx.collaborators
            .message_all(members, &ctx.config.message("room_cleared", &[]));
    }
    if let Some(room) = &outcome.unlocked {
        ctx.bus.publish(RoomEvent::RoomUnlocked {
            run: run.clone(),
            room: room.clone(),
        });
    }
    if boss_unlocked {
        info!(target: "runtime::handlers", %run, "Boss room unlocked");
        ctx.collaborators
            .message_all(members, &ctx.config.message("boss_awaits", &[]));
    }
}

/// Spawns the boss of `run` and tells its members.
fn spawn_boss(ctx: &EngineContext<'_>, run: &RunHandle) -> Result<()> {
    let (id, members, spawned, boss_type) = {
        let mut guard = lock_run(run)?;
        let spawned = guard.spawn_boss(ctx.collaborators.world.as_ref())?;
        let boss_type = guard
            .boss()
            .map(|boss| boss.boss_type().to_owned())
            .unwrap_or_default();
        (guard.id().clone(), guard.members(), spawned, boss_type)
    };

    let Some(entity) = spawned else {
        warn!(target: "runtime::handlers", run = %id, "World refused to spawn the boss");
        return Ok(());
    };
    info!(target: "runtime::handlers", run = %id, %entity, boss = %boss_type, "Boss spawned");
    ctx.bus.publish(BossEvent::BossSpawned {
        run: id,
        entity,
    });
    let collaborators = ctx.collaborators;
    collaborators.message_all(&members, &ctx.config.message("boss_spawned", &[]));
    collaborators.title_all(&members, "BOSS FIGHT!", &boss_type);
    collaborators.show_boss_bar(&members, &boss_type);
    Ok(())
}

/// Spawns a boss that appears as soon as its room unlocks.
///
/// Called wherever the boss room can unlock: an enemy death, an empty room
/// clearing on activation, and the start of a run without rooms.
fn spawn_due_boss(ctx: &EngineContext<'_>, run: &RunHandle) -> Result<()> {
    if !lock_run(run)?.boss_due() {
        return Ok(());
    }
    match spawn_boss(ctx, run) {
        Err(error) if error.is_noop() => {
            debug!(target: "runtime::handlers", %error, "Boss already spawned");
            Ok(())
        }
        other => other,
    }
}
