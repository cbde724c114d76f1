//! Handler for player disconnects.

use tracing::info;

use super::GameEventHandler;
use crate::api::Result;
use crate::context::EngineContext;
use crate::events::GameEvent;

/// Drops a disconnecting player from their run.
///
/// The registry closes a run once its last member leaves. The pending
/// countdown of such a run is cancelled and its portal let go.
#[derive(Debug, Clone, Copy)]
pub struct QuitHandler;

impl GameEventHandler for QuitHandler {
    fn name(&self) -> &'static str {
        "quit"
    }

    fn handle(&self, event: &GameEvent, ctx: &EngineContext<'_>) -> Result<()> {
        let GameEvent::PlayerQuit { player } = event else {
            return Ok(());
        };
        let Some(departure) = ctx.registry.remove_player(player)? else {
            return Ok(());
        };
        ctx.collaborators.hide_boss_bar(std::slice::from_ref(player));

        if departure.emptied {
            ctx.completion.cancel_countdown(&departure.run)?;
            ctx.gate.release(&departure.dungeon, &departure.run)?;
            info!(target: "runtime::handlers", run = %departure.run, "Last member left, run closed");
        }
        Ok(())
    }
}
