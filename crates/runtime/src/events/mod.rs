//! Events flowing in and out of the engine.
//!
//! [`GameEvent`] is what the host world reports. Everything else is
//! published on topics of the [`EventBus`], and consumers subscribe only to
//! the topics they need. Nothing in the engine depends on a subscriber
//! existing.

mod bus;
mod game_event;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use game_event::GameEvent;
pub use types::{BossEvent, PortalEvent, RoomEvent, RunEvent};
