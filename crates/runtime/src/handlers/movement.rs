//! Handler for player movement.

use tracing::debug;

use super::{GameEventHandler, announce_clear, spawn_boss, spawn_due_boss};
use crate::api::Result;
use crate::context::EngineContext;
use crate::events::{GameEvent, RoomEvent};
use crate::registry::lock_run;

/// Activates rooms and the boss room as members walk into them.
#[derive(Debug, Clone, Copy)]
pub struct MovementHandler;

impl GameEventHandler for MovementHandler {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn handle(&self, event: &GameEvent, ctx: &EngineContext<'_>) -> Result<()> {
        let GameEvent::PlayerMoved { player, from, to } = event else {
            return Ok(());
        };
        if from.same_block(to) {
            return Ok(());
        }
        let Some(run) = ctx.registry.player_run_handle(player)? else {
            return Ok(());
        };

        let (id, members, rooms, boss_entered) = {
            let guard = lock_run(&run)?;
            if !guard.is_active() {
                return Ok(());
            }
            (
                guard.id().clone(),
                guard.members(),
                guard.rooms_entered(from, to),
                guard.boss_room_entered(from, to),
            )
        };

        let world = ctx.collaborators.world.as_ref();
        for room in rooms {
            let activation = match lock_run(&run)?.activate_room(&room, world) {
                Ok(activation) => activation,
                Err(error) if error.is_noop() => {
                    debug!(target: "runtime::handlers", run = %id, %room, "Room already active");
                    continue;
                }
                Err(error) => return Err(error.into()),
            };
            debug!(target: "runtime::handlers", run = %id, %room, %player, enemies = activation.spawned.len(), "Room activated");
            ctx.bus.publish(RoomEvent::RoomActivated {
                run: id.clone(),
                room: room.clone(),
                enemies: activation.spawned.len(),
            });
            if let Some(cleared) = &activation.cleared {
                announce_clear(ctx, &id, &members, cleared, activation.boss_unlocked);
            }
            if activation.boss_unlocked {
                spawn_due_boss(ctx, &run)?;
            }
        }

        if boss_entered {
            match spawn_boss(ctx, &run) {
                Err(error) if error.is_noop() => {
                    debug!(target: "runtime::handlers", run = %id, "Boss already spawned");
                }
                other => other?,
            }
        }
        Ok(())
    }
}
