//! Engine façade.
//!
//! The engine owns the registry, the access gate and the completion
//! pipeline, and exposes one entry point per host callback plus the
//! scheduler tick. Every entry point is synchronous and never blocks on a
//! collaborator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dungeon_core::{
    DungeonTemplate, EngineConfig, EntityId, Location, PlayerId, RunId, RunSnapshot, ShardInventory,
    World,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{Collaborators, Messenger, Result, RewardGranter, RuntimeError};
use crate::completion::CompletionSequencer;
use crate::context::EngineContext;
use crate::events::{Event, EventBus, GameEvent, Topic};
use crate::gate::AccessGate;
use crate::handlers::{GameEventHandler, HandlerCriticality, default_handlers};
use crate::registry::{InstanceRegistry, lock_run};

pub struct Engine {
    config: EngineConfig,
    registry: InstanceRegistry,
    gate: AccessGate,
    completion: CompletionSequencer,
    collaborators: Collaborators,
    bus: EventBus,
    handlers: Vec<Box<dyn GameEventHandler>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn context(&self) -> EngineContext<'_> {
        EngineContext {
            config: &self.config,
            registry: &self.registry,
            gate: &self.gate,
            completion: &self.completion,
            collaborators: &self.collaborators,
            bus: &self.bus,
        }
    }

    /// Runs `event` through every handler.
    ///
    /// Idempotency no-ops are absorbed. Failures of non-critical handlers are
    /// logged; the first critical failure is returned after all handlers ran.
    pub fn dispatch(&self, event: &GameEvent) -> Result<()> {
        let ctx = self.context();
        let mut failure = None;
        for handler in &self.handlers {
            let Err(error) = handler.handle(event, &ctx) else {
                continue;
            };
            if error.is_noop() {
                debug!(target: "runtime::handlers", handler = handler.name(), event = event.name(), %error, "Ignored repeated transition");
                continue;
            }
            match handler.criticality() {
                HandlerCriticality::Critical => {
                    warn!(target: "runtime::handlers", handler = handler.name(), event = event.name(), code = error.error_code(), %error, "Critical handler failed");
                    failure.get_or_insert(error);
                }
                HandlerCriticality::Important => {
                    warn!(target: "runtime::handlers", handler = handler.name(), event = event.name(), code = error.error_code(), %error, "Handler failed");
                }
                HandlerCriticality::Optional => {
                    debug!(target: "runtime::handlers", handler = handler.name(), event = event.name(), %error, "Optional handler failed");
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }

    pub fn on_entity_death(&self, entity: EntityId, killer: Option<PlayerId>) -> Result<()> {
        self.dispatch(&GameEvent::EntityDeath { entity, killer })
    }

    pub fn on_player_moved(&self, player: PlayerId, from: Location, to: Location) -> Result<()> {
        self.dispatch(&GameEvent::PlayerMoved { player, from, to })
    }

    pub fn on_portal_interact(&self, player: PlayerId, location: Location) -> Result<()> {
        self.dispatch(&GameEvent::PortalInteract { player, location })
    }

    pub fn on_player_quit(&self, player: PlayerId) -> Result<()> {
        self.dispatch(&GameEvent::PlayerQuit { player })
    }

    /// Scheduler tick, expected once per second.
    pub fn tick(&self) -> Result<()> {
        self.tick_at(Utc::now())
    }

    /// Advances countdowns and stops runs that ran out of time at `now`.
    pub fn tick_at(&self, now: DateTime<Utc>) -> Result<()> {
        let ctx = self.context();
        self.completion.tick_all(&ctx)?;
        if !self.config.enforce_time_limit {
            return Ok(());
        }

        for run in self.registry.all()? {
            let expired = match lock_run(&run) {
                Ok(guard) => guard.is_time_expired(now).then(|| guard.id().clone()),
                Err(error) => {
                    warn!(target: "runtime::engine", %error, "Skipping run in time-limit check");
                    continue;
                }
            };
            if let Some(id) = expired {
                info!(target: "runtime::engine", run = %id, "Time limit reached");
                if let Err(error) = self.completion.stop(&ctx, &id, Some("time_expired")) {
                    warn!(target: "runtime::engine", run = %id, %error, "Time-limit stop failed");
                }
            }
        }
        Ok(())
    }

    /// Operator stop. Returns false if the run is not registered.
    pub fn stop_run(&self, run: &RunId) -> Result<bool> {
        self.completion.stop(&self.context(), run, None)
    }

    /// Stops every live run. A run that fails to stop is logged and left
    /// behind. Returns how many runs were stopped.
    pub fn stop_all(&self) -> Result<usize> {
        let ctx = self.context();
        let mut stopped = 0;
        for run in self.registry.all()? {
            let id = match lock_run(&run) {
                Ok(guard) => guard.id().clone(),
                Err(error) => {
                    warn!(target: "runtime::engine", %error, "Skipping run on stop");
                    continue;
                }
            };
            match self.completion.stop(&ctx, &id, None) {
                Ok(true) => stopped += 1,
                Ok(false) => {}
                Err(error) => warn!(target: "runtime::engine", run = %id, %error, "Stop failed"),
            }
        }
        Ok(stopped)
    }

    /// Swaps in a new template set. Returns the dungeons that disappeared.
    pub fn reload_templates(&self, templates: Vec<DungeonTemplate>) -> Result<Vec<String>> {
        for template in &templates {
            template.validate()?;
        }
        self.gate.reload(&templates)?;
        let removed = self.registry.reload_templates(templates)?;
        for dungeon in &removed {
            info!(target: "runtime::engine", dungeon, "Template removed");
        }
        Ok(removed)
    }

    pub fn give_shard(&self, player: &PlayerId, dungeon: &str, amount: u32) -> Result<bool> {
        self.gate
            .give_shard(player, dungeon, amount, self.collaborators.inventory.as_ref())
    }

    pub fn snapshot(&self, run: &RunId) -> Result<Option<RunSnapshot>> {
        let countdown = self.completion.remaining(run)?;
        match self.registry.get(run)? {
            Some(handle) => Ok(Some(lock_run(&handle)?.snapshot(countdown))),
            None => Ok(None),
        }
    }

    /// Snapshots of every live run, oldest first.
    pub fn snapshots(&self) -> Result<Vec<RunSnapshot>> {
        let mut snapshots = Vec::new();
        for handle in self.registry.all()? {
            let id = lock_run(&handle)?.id().clone();
            let countdown = self.completion.remaining(&id)?;
            snapshots.push(lock_run(&handle)?.snapshot(countdown));
        }
        Ok(snapshots)
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.bus.subscribe(topic)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn completion(&self) -> &CompletionSequencer {
        &self.completion
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    templates: Vec<DungeonTemplate>,
    world: Option<Arc<dyn World>>,
    inventory: Option<Arc<dyn ShardInventory>>,
    messenger: Option<Arc<dyn Messenger>>,
    rewards: Option<Arc<dyn RewardGranter>>,
    bus: Option<EventBus>,
    handlers: Vec<Box<dyn GameEventHandler>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn templates(mut self, templates: impl IntoIterator<Item = DungeonTemplate>) -> Self {
        self.templates.extend(templates);
        self
    }

    pub fn template(mut self, template: DungeonTemplate) -> Self {
        self.templates.push(template);
        self
    }

    pub fn world(mut self, world: Arc<dyn World>) -> Self {
        self.world = Some(world);
        self
    }

    pub fn inventory(mut self, inventory: Arc<dyn ShardInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    pub fn rewards(mut self, rewards: Arc<dyn RewardGranter>) -> Self {
        self.rewards = Some(rewards);
        self
    }

    /// Shares an existing bus instead of creating one from the config.
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Adds a handler after the built-in ones.
    pub fn handler(mut self, handler: impl GameEventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn build(self) -> Result<Engine> {
        let collaborators = Collaborators {
            world: self.world.ok_or(RuntimeError::MissingCollaborator("world"))?,
            inventory: self
                .inventory
                .ok_or(RuntimeError::MissingCollaborator("inventory"))?,
            messenger: self
                .messenger
                .ok_or(RuntimeError::MissingCollaborator("messenger"))?,
            rewards: self
                .rewards
                .ok_or(RuntimeError::MissingCollaborator("rewards"))?,
        };
        let bus = self
            .bus
            .unwrap_or_else(|| EventBus::with_capacity(self.config.event_buffer_size));

        let registry = InstanceRegistry::new(
            self.config.max_concurrent_instances,
            Arc::clone(&collaborators.world),
            bus.clone(),
        );
        let gate = AccessGate::new(self.config.portal_radius, bus.clone());
        let mut handlers = default_handlers();
        handlers.extend(self.handlers);

        let engine = Engine {
            config: self.config,
            registry,
            gate,
            completion: CompletionSequencer::new(),
            collaborators,
            bus,
            handlers,
        };
        engine.reload_templates(self.templates)?;
        info!(
            target: "runtime::engine",
            templates = engine.registry.template_names()?.len(),
            max_instances = engine.config.max_concurrent_instances,
            "Engine ready"
        );
        Ok(engine)
    }
}
