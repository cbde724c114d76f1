//! Unified error types surfaced by the runtime API.
//!
//! Wraps domain failures from `dungeon-core` and adds the conditions that only
//! exist once runs are shared across threads and collaborators.
use dungeon_core::{DungeonError, ErrorSeverity};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Dungeon(#[from] DungeonError),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("engine requires a {0} collaborator before building")]
    MissingCollaborator(&'static str),
}

impl RuntimeError {
    /// Domain error carried by this failure, if any.
    pub fn dungeon(&self) -> Option<&DungeonError> {
        match self {
            Self::Dungeon(err) => Some(err),
            _ => None,
        }
    }

    /// Idempotency no-ops that callers drop without telling anyone.
    pub fn is_noop(&self) -> bool {
        self.dungeon().is_some_and(DungeonError::is_noop)
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Dungeon(err) => err.severity(),
            Self::Collaborator(_) => ErrorSeverity::Recoverable,
            Self::LockPoisoned(_) | Self::MissingCollaborator(_) => ErrorSeverity::Internal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Dungeon(err) => err.error_code(),
            Self::LockPoisoned(_) => "LOCK_POISONED",
            Self::Collaborator(_) => "COLLABORATOR_FAILED",
            Self::MissingCollaborator(_) => "MISSING_COLLABORATOR",
        }
    }
}

/// Failure reported by an external collaborator (messaging, rewards, ...).
///
/// These are logged and skipped; they never abort the transition that
/// triggered the call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{collaborator} failed: {reason}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub reason: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self {
            collaborator,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use dungeon_core::{EntityId, Transition};

    use super::*;

    #[test]
    fn noops_are_detected_through_the_wrapper() {
        let err = RuntimeError::from(DungeonError::UntrackedEntity(EntityId(3)));
        assert!(err.is_noop());
        let err = RuntimeError::from(DungeonError::AlreadyProcessed(Transition::Victory));
        assert!(err.is_noop());
        assert!(!RuntimeError::LockPoisoned("registry").is_noop());
    }

    #[test]
    fn collaborator_errors_are_recoverable() {
        let err = RuntimeError::from(CollaboratorError::new("rewards", "inventory full"));
        assert_eq!(err.to_string(), "rewards failed: inventory full");
        assert!(err.severity().is_recoverable());
        assert_eq!(err.error_code(), "COLLABORATOR_FAILED");
    }
}
