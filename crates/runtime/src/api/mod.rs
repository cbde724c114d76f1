//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate:
//! the error taxonomy and the collaborator traits a host implements.

pub mod collaborators;
pub mod errors;

pub use collaborators::{Collaborators, Messenger, RewardGranter};
pub use errors::{CollaboratorError, Result, RuntimeError};
