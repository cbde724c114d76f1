//! Handler for entity death.

use dungeon_core::{DeathOutcome, EntityId, PlayerId};
use tracing::{debug, info};

use super::{GameEventHandler, HandlerCriticality, announce_clear, spawn_due_boss};
use crate::api::Result;
use crate::context::EngineContext;
use crate::events::{BossEvent, GameEvent};
use crate::registry::{RunHandle, lock_run};

/// Routes deaths to the run that tracks the entity.
///
/// Enemy deaths can clear rooms and open the boss room; a boss death hands
/// the run to the completion pipeline.
#[derive(Debug, Clone, Copy)]
pub struct DeathHandler;

impl DeathHandler {
    fn owner(ctx: &EngineContext<'_>, entity: EntityId) -> Result<Option<RunHandle>> {
        for run in ctx.registry.all()? {
            if lock_run(&run)?.tracks(entity) {
                return Ok(Some(run));
            }
        }
        Ok(None)
    }
}

impl GameEventHandler for DeathHandler {
    fn name(&self) -> &'static str {
        "death"
    }

    fn criticality(&self) -> HandlerCriticality {
        // A lost death leaves a room uncleared forever.
        HandlerCriticality::Critical
    }

    fn handle(&self, event: &GameEvent, ctx: &EngineContext<'_>) -> Result<()> {
        let GameEvent::EntityDeath { entity, killer } = event else {
            return Ok(());
        };
        let Some(run) = Self::owner(ctx, *entity)? else {
            debug!(target: "runtime::handlers", %entity, "Untracked entity died");
            return Ok(());
        };

        let (id, members, outcome) = {
            let mut guard = lock_run(&run)?;
            let outcome = guard.on_entity_death(*entity, ctx.collaborators.world.as_ref())?;
            (guard.id().clone(), guard.members(), outcome)
        };

        match outcome {
            DeathOutcome::Enemy {
                cleared,
                boss_unlocked,
                ..
            } => {
                if let Some(cleared) = &cleared {
                    announce_clear(ctx, &id, &members, cleared, boss_unlocked);
                }
                if boss_unlocked {
                    spawn_due_boss(ctx, &run)?;
                }
                Ok(())
            }
            DeathOutcome::Boss { entity } => {
                info!(target: "runtime::handlers", run = %id, %entity, "Boss defeated");
                ctx.bus.publish(BossEvent::BossDefeated {
                    run: id,
                    entity,
                    killer: killer.clone(),
                });
                let slayer = killer.as_ref().map_or("Someone", PlayerId::as_str);
                let collaborators = ctx.collaborators;
                collaborators.hide_boss_bar(&members);
                collaborators.message_all(
                    &members,
                    &ctx.config.message("boss_defeated", &[("player", slayer)]),
                );
                ctx.completion.handle_victory(ctx, &run)
            }
        }
    }
}
