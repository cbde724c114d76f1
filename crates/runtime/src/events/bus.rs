//! Topic-based event bus implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{BossEvent, PortalEvent, RoomEvent, RunEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Run lifecycle and membership
    Run,
    /// Room unlock, activation and clear
    Room,
    /// Boss spawn and defeat
    Boss,
    /// Portal state changes
    Portal,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Run(RunEvent),
    Room(RoomEvent),
    Boss(BossEvent),
    Portal(PortalEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Run(_) => Topic::Run,
            Event::Room(_) => Topic::Room,
            Event::Boss(_) => Topic::Boss,
            Event::Portal(_) => Topic::Portal,
        }
    }
}

impl From<RunEvent> for Event {
    fn from(event: RunEvent) -> Self {
        Event::Run(event)
    }
}

impl From<RoomEvent> for Event {
    fn from(event: RoomEvent) -> Self {
        Event::Room(event)
    }
}

impl From<BossEvent> for Event {
    fn from(event: BossEvent) -> Self {
        Event::Boss(event)
    }
}

impl From<PortalEvent> for Event {
    fn from(event: PortalEvent) -> Self {
        Event::Portal(event)
    }
}

/// One broadcast channel per topic, created up front.
#[derive(Debug)]
struct Channels {
    run: broadcast::Sender<Event>,
    room: broadcast::Sender<Event>,
    boss: broadcast::Sender<Event>,
    portal: broadcast::Sender<Event>,
}

impl Channels {
    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Run => &self.run,
            Topic::Room => &self.room,
            Topic::Boss => &self.boss,
            Topic::Portal => &self.portal,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Publishing never blocks and never fails the
/// transition that produced the event.
#[derive(Debug, Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Channels {
                run: broadcast::channel(capacity).0,
                room: broadcast::channel(capacity).0,
                boss: broadcast::channel(capacity).0,
                portal: broadcast::channel(capacity).0,
            }),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let topic = event.topic();
        if self.channels.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> Vec<(Topic, broadcast::Receiver<Event>)> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
