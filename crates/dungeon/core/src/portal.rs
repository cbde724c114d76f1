//! Per-dungeon entry portal.

use chrono::{DateTime, Utc};

use crate::error::{DungeonError, Result, Transition};
use crate::ids::RunId;
use crate::location::Location;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PortalState {
    /// Needs a shard to open. Admits nobody.
    Inactive,
    /// Open; admits players into its bound run while it has room.
    Active,
    /// The bound run was won; admits nobody until the countdown ends.
    Closing,
}

/// Entry point of one dungeon.
///
/// While `Active` the portal serves a single run, bound on the first
/// admission and released on deactivate.
#[derive(Clone, Debug)]
pub struct Portal {
    dungeon: String,
    location: Location,
    state: PortalState,
    activated_at: Option<DateTime<Utc>>,
    bound_run: Option<RunId>,
}

impl Portal {
    pub fn new(dungeon: impl Into<String>, location: Location) -> Self {
        Self {
            dungeon: dungeon.into(),
            location,
            state: PortalState::Inactive,
            activated_at: None,
            bound_run: None,
        }
    }

    pub fn dungeon(&self) -> &str {
        &self.dungeon
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn state(&self) -> PortalState {
        self.state
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    pub fn bound_run(&self) -> Option<&RunId> {
        self.bound_run.as_ref()
    }

    pub fn admits(&self) -> bool {
        self.state == PortalState::Active
    }

    /// `Inactive -> Active`.
    pub fn activate(&mut self) -> Result<()> {
        match self.state {
            PortalState::Inactive => {
                self.state = PortalState::Active;
                self.activated_at = Some(Utc::now());
                Ok(())
            }
            PortalState::Active => Err(DungeonError::AlreadyProcessed(Transition::ActivatePortal)),
            PortalState::Closing => Err(DungeonError::PortalClosing(self.dungeon.clone())),
        }
    }

    /// `Active -> Closing`. Returns whether the state changed.
    pub fn close(&mut self) -> bool {
        if self.state != PortalState::Active {
            return false;
        }
        self.state = PortalState::Closing;
        true
    }

    /// Any state `-> Inactive`, dropping the run binding.
    pub fn deactivate(&mut self) -> bool {
        self.bound_run = None;
        self.activated_at = None;
        if self.state == PortalState::Inactive {
            return false;
        }
        self.state = PortalState::Inactive;
        true
    }

    pub fn bind(&mut self, run: RunId) {
        self.bound_run = Some(run);
    }

    pub fn unbind(&mut self) -> Option<RunId> {
        self.bound_run.take()
    }

    /// Distance from the portal block, infinite across worlds.
    pub fn distance(&self, to: &Location) -> f64 {
        self.location.distance(to)
    }
}
