use std::collections::BTreeMap;

/// Built-in player-facing messages. `{name}` placeholders are filled by
/// [`EngineConfig::message`].
pub const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("portal_activated", "Portal activated! Step through to enter the dungeon."),
    ("no_shard", "You don't have the required shard! ({item})"),
    ("portal_closing", "This portal is closing. Wait for the next run."),
    ("instance_full", "This dungeon instance is full."),
    ("dungeon_not_found", "No dungeon named {item} exists."),
    ("entering", "Entering {item}..."),
    ("dungeon_started", "The dungeon has begun! Clear all rooms to face the boss."),
    ("room_cleared", "Room cleared! The door has opened."),
    ("boss_awaits", "All rooms cleared. The guardian awaits."),
    ("boss_spawned", "BOSS FIGHT! Defeat the guardian to complete the dungeon!"),
    ("boss_defeated", "{player} has slain the guardian!"),
    ("dungeon_complete", "DUNGEON COMPLETED in {time}! Well done!"),
    ("countdown", "Returning to the surface in {time} seconds..."),
    ("teleporting", "Teleporting you back..."),
    ("time_expired", "Time is up! The dungeon collapses."),
    ("already_in_run", "You are already in a dungeon run."),
    ("reward", "Reward: {amount} x {item}"),
];

/// Engine-wide tunables.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Max distance between an interaction and a portal block.
    pub portal_radius: f64,
    /// Live runs allowed at once across every dungeon.
    pub max_concurrent_instances: usize,
    /// Countdown used when a template does not set one.
    pub default_completion_countdown: u32,
    /// Stop runs that outlive their template time limit.
    pub enforce_time_limit: bool,
    /// Capacity of each event bus topic.
    pub event_buffer_size: usize,
    /// Overrides of [`DEFAULT_MESSAGES`], keyed by message name.
    pub messages: BTreeMap<String, String>,
}

impl EngineConfig {
    pub const DEFAULT_PORTAL_RADIUS: f64 = 3.0;
    pub const DEFAULT_MAX_INSTANCES: usize = 10;
    pub const DEFAULT_COUNTDOWN: u32 = 30;
    pub const DEFAULT_EVENT_BUFFER: usize = 100;

    /// Renders message `key`, substituting `{name}` placeholders from `vars`.
    ///
    /// Unknown keys render as a visible marker rather than failing.
    pub fn message(&self, key: &str, vars: &[(&str, &str)]) -> String {
        let template = self
            .messages
            .get(key)
            .map(String::as_str)
            .or_else(|| {
                DEFAULT_MESSAGES
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, text)| *text)
            });
        let Some(template) = template else {
            return format!("Message not found: {key}");
        };
        vars.iter()
            .fold(template.to_owned(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            portal_radius: Self::DEFAULT_PORTAL_RADIUS,
            max_concurrent_instances: Self::DEFAULT_MAX_INSTANCES,
            default_completion_countdown: Self::DEFAULT_COUNTDOWN,
            enforce_time_limit: true,
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER,
            messages: BTreeMap::new(),
        }
    }
}
