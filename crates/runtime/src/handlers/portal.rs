//! Handler for portal interaction.

use dungeon_core::{DungeonError, PlayerId};
use tracing::{debug, info};

use super::{GameEventHandler, spawn_due_boss};
use crate::api::{Result, RuntimeError};
use crate::context::EngineContext;
use crate::events::GameEvent;
use crate::gate::Admission;
use crate::registry::lock_run;

/// Runs portal admission and tells the player how it went.
///
/// Every refusal a player can cause ends in exactly one chat line. Only a
/// click on something that is not a portal stays silent.
#[derive(Debug, Clone, Copy)]
pub struct PortalHandler;

impl PortalHandler {
    fn admitted(ctx: &EngineContext<'_>, player: &PlayerId, admission: Admission) -> Result<()> {
        let collaborators = ctx.collaborators;
        match admission {
            Admission::Activated { .. } => {
                collaborators.message(player, &ctx.config.message("portal_activated", &[]));
            }
            Admission::Entered {
                dungeon,
                run,
                entry,
                outcome,
            } => {
                if outcome.added {
                    let name = ctx
                        .registry
                        .template(&dungeon)?
                        .map_or(dungeon.clone(), |template| template.display_name().to_owned());
                    collaborators.message(player, &ctx.config.message("entering", &[("item", &name)]));
                    collaborators.teleport(player, &entry);
                }
                if outcome.started {
                    let handle = ctx.registry.get(&run)?;
                    let members = match &handle {
                        Some(handle) => lock_run(handle)?.members(),
                        None => vec![player.clone()],
                    };
                    info!(target: "runtime::handlers", %run, members = members.len(), "Run underway");
                    collaborators.message_all(&members, &ctx.config.message("dungeon_started", &[]));
                    // A run without rooms opens with its boss room unlocked.
                    if let Some(handle) = &handle {
                        spawn_due_boss(ctx, handle)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn refused(ctx: &EngineContext<'_>, player: &PlayerId, error: RuntimeError) -> Result<()> {
        let message = match error.dungeon().cloned() {
            Some(DungeonError::UnknownPortal(_)) => return Ok(()),
            Some(DungeonError::MissingAccessToken { dungeon, .. }) => {
                let item = ctx
                    .gate
                    .shard_definition(&dungeon)?
                    .map_or_else(|| format!("{dungeon} shard"), |shard| shard.display_name());
                ctx.config.message("no_shard", &[("item", &item)])
            }
            Some(DungeonError::PortalClosing(_)) => ctx.config.message("portal_closing", &[]),
            Some(DungeonError::InstanceFull { .. } | DungeonError::InstanceLimitReached { .. }) => {
                ctx.config.message("instance_full", &[])
            }
            Some(DungeonError::AlreadyInRun { .. }) => ctx.config.message("already_in_run", &[]),
            Some(DungeonError::UnknownTemplate(name)) => {
                ctx.config.message("dungeon_not_found", &[("item", &name)])
            }
            _ => return Err(error),
        };
        debug!(target: "runtime::handlers", %player, code = error.error_code(), "Portal refused player");
        ctx.collaborators.message(player, &message);
        Ok(())
    }
}

impl GameEventHandler for PortalHandler {
    fn name(&self) -> &'static str {
        "portal"
    }

    fn handle(&self, event: &GameEvent, ctx: &EngineContext<'_>) -> Result<()> {
        let GameEvent::PortalInteract { player, location } = event else {
            return Ok(());
        };
        let inventory = ctx.collaborators.inventory.as_ref();
        match ctx.gate.interact(player, location, ctx.registry, inventory) {
            Ok(admission) => Self::admitted(ctx, player, admission),
            Err(error) => Self::refused(ctx, player, error),
        }
    }
}
