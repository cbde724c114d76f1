//! Post-victory pipeline: rewards, countdown, teleport-out and teardown.
//!
//! Countdowns are driven by an external once-per-second tick. Every tick
//! re-checks that the run is still registered and still `Completing`, so a
//! run closed through another path simply drops its countdown.

mod countdown;

pub use countdown::Countdown;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use dungeon_core::{RunId, RunState, format_duration};
use tracing::{debug, info, warn};

use crate::api::{Result, RuntimeError};
use crate::context::EngineContext;
use crate::events::RunEvent;
use crate::registry::{RunHandle, lock_run};

#[derive(Debug, Default)]
pub struct CompletionSequencer {
    countdowns: Mutex<HashMap<RunId, Countdown>>,
}

impl CompletionSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    fn countdowns(&self) -> Result<MutexGuard<'_, HashMap<RunId, Countdown>>> {
        self.countdowns
            .lock()
            .map_err(|_| RuntimeError::LockPoisoned("countdowns"))
    }

    /// Completes the run, closes its portal, rewards every member and starts
    /// the countdown.
    ///
    /// A second call for the same run fails with `AlreadyProcessed` and has
    /// no side effects.
    pub fn handle_victory(&self, ctx: &EngineContext<'_>, run: &RunHandle) -> Result<()> {
        let (id, dungeon, members, rewards, seconds, elapsed) = {
            let mut guard = lock_run(run)?;
            guard.complete()?;
            let template = guard.template();
            let seconds = match template.completion_countdown {
                0 => ctx.config.default_completion_countdown,
                seconds => seconds,
            };
            (
                guard.id().clone(),
                guard.dungeon().to_owned(),
                guard.members(),
                template.rewards.clone(),
                seconds,
                guard.elapsed(),
            )
        };

        ctx.gate.close_portal(&dungeon)?;
        ctx.bus.publish(RunEvent::RunCompleted {
            run: id.clone(),
            elapsed_secs: elapsed,
        });

        let time = format_duration(elapsed);
        let collaborators = ctx.collaborators;
        collaborators.message_all(
            &members,
            &ctx.config.message("dungeon_complete", &[("time", &time)]),
        );
        for member in &members {
            for reward in &rewards {
                collaborators.grant(member, reward);
                let amount = reward.amount.to_string();
                collaborators.message(
                    member,
                    &ctx.config.message(
                        "reward",
                        &[("item", &reward.item_id), ("amount", &amount)],
                    ),
                );
            }
        }

        self.countdowns()?
            .insert(id.clone(), Countdown::new(id.clone(), dungeon, seconds));
        info!(target: "runtime::completion", run = %id, countdown = seconds, elapsed = %time, "Victory processed");
        Ok(())
    }

    /// Advances the countdown of `run` by one second.
    ///
    /// Returns the seconds left, or `None` when no countdown is pending.
    pub fn on_countdown_tick(&self, ctx: &EngineContext<'_>, run: &RunId) -> Result<Option<u32>> {
        let (remaining, dungeon) = {
            let mut countdowns = self.countdowns()?;
            let Some(countdown) = countdowns.get_mut(run) else {
                return Ok(None);
            };
            (countdown.tick(), countdown.dungeon.clone())
        };

        let members = match ctx.registry.get(run)? {
            Some(handle) => {
                let guard = lock_run(&handle)?;
                (guard.state() == RunState::Completing).then(|| guard.members())
            }
            None => None,
        };
        let Some(members) = members else {
            debug!(target: "runtime::completion", %run, "Run gone, dropping countdown");
            self.cancel_countdown(run)?;
            ctx.gate.release(&dungeon, run)?;
            return Ok(None);
        };

        ctx.bus.publish(RunEvent::CountdownTick {
            run: run.clone(),
            remaining,
        });
        if remaining > 0 {
            let seconds = remaining.to_string();
            let collaborators = ctx.collaborators;
            collaborators.message_all(
                &members,
                &ctx.config.message("countdown", &[("time", &seconds)]),
            );
            if Countdown::is_title_second(remaining) {
                collaborators.title_all(
                    &members,
                    "DUNGEON COMPLETE!",
                    &format!("Returning in {remaining} seconds"),
                );
            }
            return Ok(Some(remaining));
        }

        self.cancel_countdown(run)?;
        self.on_countdown_complete(ctx, run)?;
        Ok(Some(0))
    }

    /// Ticks every pending countdown once.
    ///
    /// A failing countdown is logged and does not hold back the others.
    pub fn tick_all(&self, ctx: &EngineContext<'_>) -> Result<()> {
        let runs: Vec<RunId> = self.countdowns()?.keys().cloned().collect();
        for run in runs {
            if let Err(error) = self.on_countdown_tick(ctx, &run) {
                warn!(target: "runtime::completion", %run, %error, "Countdown tick failed");
            }
        }
        Ok(())
    }

    /// Sends members to the exit, resets the run, frees the portal and closes
    /// the run.
    pub fn on_countdown_complete(&self, ctx: &EngineContext<'_>, run: &RunId) -> Result<()> {
        let Some(handle) = ctx.registry.get(run)? else {
            return Ok(());
        };
        let (members, exit, dungeon) = {
            let guard = lock_run(&handle)?;
            (
                guard.members(),
                guard.template().exit_point.clone(),
                guard.dungeon().to_owned(),
            )
        };

        let collaborators = ctx.collaborators;
        let teleporting = ctx.config.message("teleporting", &[]);
        collaborators.hide_boss_bar(&members);
        for member in &members {
            collaborators.message(member, &teleporting);
            collaborators.teleport(member, &exit);
        }

        if let Err(error) = lock_run(&handle)?.reset(collaborators.world.as_ref()) {
            debug!(target: "runtime::completion", %run, %error, "Run already reset");
        }
        ctx.gate.deactivate(&dungeon)?;
        ctx.registry.close(run)?;
        info!(target: "runtime::completion", %run, members = members.len(), "Run torn down");
        Ok(())
    }

    /// Sends members out and closes a run before it finished on its own.
    ///
    /// `reason` names a message shown to members first. Returns false if
    /// the run is not registered.
    pub fn stop(&self, ctx: &EngineContext<'_>, run: &RunId, reason: Option<&str>) -> Result<bool> {
        let Some(handle) = ctx.registry.get(run)? else {
            return Ok(false);
        };
        self.cancel_countdown(run)?;
        let (members, exit, dungeon) = {
            let guard = lock_run(&handle)?;
            (
                guard.members(),
                guard.template().exit_point.clone(),
                guard.dungeon().to_owned(),
            )
        };

        let collaborators = ctx.collaborators;
        if let Some(key) = reason {
            collaborators.message_all(&members, &ctx.config.message(key, &[]));
        }
        collaborators.hide_boss_bar(&members);
        for member in &members {
            collaborators.teleport(member, &exit);
        }

        if let Err(error) = lock_run(&handle)?.reset(collaborators.world.as_ref()) {
            debug!(target: "runtime::completion", %run, %error, "Run already reset");
        }
        ctx.gate.release(&dungeon, run)?;
        ctx.registry.close(run)?;
        info!(target: "runtime::completion", %run, reason = reason.unwrap_or("operator"), "Run stopped");
        Ok(true)
    }

    /// Drops the pending countdown of `run`. Returns whether one existed.
    pub fn cancel_countdown(&self, run: &RunId) -> Result<bool> {
        Ok(self.countdowns()?.remove(run).is_some())
    }

    pub fn remaining(&self, run: &RunId) -> Result<Option<u32>> {
        Ok(self.countdowns()?.get(run).map(Countdown::remaining))
    }

    pub fn pending(&self) -> Result<usize> {
        Ok(self.countdowns()?.len())
    }
}
