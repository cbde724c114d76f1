//! Error taxonomy for instance orchestration.
//!
//! Every failure the core can report is a recoverable, locally absorbed
//! condition. Callers (event handlers, command layers) receive a typed
//! [`DungeonError`] and decide whether to tell a player about it or drop it.
//!
//! # Design Principles
//!
//! - **No panics**: the core never brings down the host process
//! - **Severity Classification**: errors are categorized for logging and recovery
//! - **Idempotency as data**: repeated transitions surface as
//!   [`DungeonError::AlreadyProcessed`] instead of silently mutating twice

use crate::ids::{EntityId, PlayerId, RunId};

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the player or caller may simply try again later
/// - **Validation**: invalid input that should be rejected without retry
/// - **Internal**: bookkeeping no-ops and unexpected inconsistencies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - the same request can succeed later.
    ///
    /// Examples: instance full, portal closing
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: unknown template, missing access token
    Validation,

    /// Internal error - bookkeeping condition that is never shown to players.
    ///
    /// Examples: double clear, death of an untracked entity
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Transitions guarded against double processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Transition {
    ActivateRoom,
    ClearRoom,
    SpawnBoss,
    Victory,
    Reset,
    ActivatePortal,
}

/// Errors surfaced by the orchestration core.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DungeonError {
    /// No template is registered under this dungeon name.
    #[error("unknown dungeon template '{0}'")]
    UnknownTemplate(String),

    /// Template failed validation.
    #[error("invalid template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },

    /// The run selected for admission is at capacity.
    #[error("instance {run} is full ({max} players)")]
    InstanceFull { run: RunId, max: u32 },

    /// The registry already holds the configured number of live runs.
    #[error("instance limit reached ({limit} live runs)")]
    InstanceLimitReached { limit: usize },

    /// Player lacks the shard needed to unlock the portal.
    #[error("{player} is missing the access shard for '{dungeon}'")]
    MissingAccessToken { player: PlayerId, dungeon: String },

    /// Portal is counting down after a completed run and admits nobody.
    #[error("portal for '{0}' is closing")]
    PortalClosing(String),

    /// No portal is registered for this dungeon or location.
    #[error("no portal registered for '{0}'")]
    UnknownPortal(String),

    /// Player already belongs to a different live run.
    #[error("{player} is already inside {run}")]
    AlreadyInRun { player: PlayerId, run: RunId },

    /// Idempotent transition that already happened.
    #[error("{0} already processed")]
    AlreadyProcessed(Transition),

    /// Death signal for an entity no encounter tracks.
    #[error("entity {0} is not tracked by any encounter")]
    UntrackedEntity(EntityId),

    #[error("unknown room '{0}'")]
    UnknownRoom(String),

    /// Room has not been unlocked yet.
    #[error("room '{0}' is locked")]
    RoomLocked(String),

    #[error("unknown run {0}")]
    UnknownRun(RunId),
}

impl DungeonError {
    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        use DungeonError::*;
        match self {
            InstanceFull { .. } | InstanceLimitReached { .. } | PortalClosing(_) => {
                ErrorSeverity::Recoverable
            }

            UnknownTemplate(_)
            | InvalidTemplate { .. }
            | MissingAccessToken { .. }
            | UnknownPortal(_)
            | AlreadyInRun { .. }
            | UnknownRoom(_)
            | RoomLocked(_)
            | UnknownRun(_) => ErrorSeverity::Validation,

            AlreadyProcessed(_) | UntrackedEntity(_) => ErrorSeverity::Internal,
        }
    }

    /// Returns a static string identifier for this error variant.
    pub fn error_code(&self) -> &'static str {
        use DungeonError::*;
        match self {
            UnknownTemplate(_) => "UNKNOWN_TEMPLATE",
            InvalidTemplate { .. } => "INVALID_TEMPLATE",
            InstanceFull { .. } => "INSTANCE_FULL",
            InstanceLimitReached { .. } => "INSTANCE_LIMIT_REACHED",
            MissingAccessToken { .. } => "MISSING_ACCESS_TOKEN",
            PortalClosing(_) => "PORTAL_CLOSING",
            UnknownPortal(_) => "UNKNOWN_PORTAL",
            AlreadyInRun { .. } => "ALREADY_IN_RUN",
            AlreadyProcessed(_) => "ALREADY_PROCESSED",
            UntrackedEntity(_) => "UNTRACKED_ENTITY",
            UnknownRoom(_) => "UNKNOWN_ROOM",
            RoomLocked(_) => "ROOM_LOCKED",
            UnknownRun(_) => "UNKNOWN_RUN",
        }
    }

    /// True for bookkeeping conditions that callers drop without telling anyone.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            DungeonError::AlreadyProcessed(_) | DungeonError::UntrackedEntity(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DungeonError>;
