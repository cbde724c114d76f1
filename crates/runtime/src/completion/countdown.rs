use dungeon_core::RunId;

/// Seconds left before the members of a won run are sent back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub run: RunId,
    pub dungeon: String,
    remaining: u32,
}

impl Countdown {
    pub fn new(run: RunId, dungeon: impl Into<String>, seconds: u32) -> Self {
        Self {
            run,
            dungeon: dungeon.into(),
            remaining: seconds,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advances one second and returns what is left.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Whether this second deserves a title, not just a chat line.
    pub fn is_title_second(remaining: u32) -> bool {
        remaining <= 10 || remaining % 10 == 0
    }
}
