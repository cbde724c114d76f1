//! Runtime orchestration of dungeon instances.
//!
//! This crate shares `dungeon-core` runs across concurrent host callbacks.
//! Consumers build an [`Engine`], feed it [`GameEvent`]s and a once-per-second
//! tick, and subscribe to the [`EventBus`] for what happened.
//!
//! Modules are organized by responsibility:
//! - [`engine`] hosts the façade and builder
//! - [`api`] exposes errors and the collaborator traits a host implements
//! - [`registry`] creates, indexes and closes runs
//! - [`gate`] turns portal clicks into admissions
//! - [`completion`] rewards winners and tears runs down after the countdown
//! - [`handlers`] routes each host event to the pieces above
//! - [`events`] provides the topic-based event bus
pub mod api;
pub mod completion;
pub mod context;
pub mod engine;
pub mod events;
pub mod gate;
pub mod handlers;
pub mod registry;

pub use api::{CollaboratorError, Collaborators, Messenger, Result, RewardGranter, RuntimeError};
pub use completion::{CompletionSequencer, Countdown};
pub use context::EngineContext;
pub use engine::{Engine, EngineBuilder};
pub use events::{
    BossEvent, Event, EventBus, GameEvent, PortalEvent, RoomEvent, RunEvent, Topic,
};
pub use gate::{AccessGate, Admission};
pub use handlers::{
    DeathHandler, GameEventHandler, HandlerCriticality, MovementHandler, PortalHandler,
    QuitHandler,
};
pub use registry::{Departure, InstanceRegistry, RunHandle, lock_run};
