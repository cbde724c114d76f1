//! Borrowed view of the engine handed to handlers and the completion pipeline.

use dungeon_core::EngineConfig;

use crate::api::Collaborators;
use crate::completion::CompletionSequencer;
use crate::events::EventBus;
use crate::gate::AccessGate;
use crate::registry::InstanceRegistry;

/// Context provided to event handlers.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub config: &'a EngineConfig,
    pub registry: &'a InstanceRegistry,
    pub gate: &'a AccessGate,
    pub completion: &'a CompletionSequencer,
    pub collaborators: &'a Collaborators,
    pub bus: &'a EventBus,
}
