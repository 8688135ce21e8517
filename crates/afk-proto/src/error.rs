//! Error taxonomy for the request lifecycle.

use thiserror::Error;

/// Result alias used across afkbot crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the agent core.
///
/// None of these are fatal: validation and conflict errors are reported back
/// to the caller, relocation timeouts degrade to the rally point, and
/// transport failures are logged and retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed command arguments (stack count, arity).
    #[error("{0}")]
    Validation(String),

    /// A request is already in flight.
    #[error("Already processing a request. Please wait.")]
    Conflict,

    /// An operation needed an active request and there is none.
    #[error("No active request.")]
    NotActive,

    /// Relocation did not confirm within the attempt ceiling.
    #[error("relocation to {target} not confirmed after {attempts} attempts")]
    RelocationTimeout { target: String, attempts: u32 },

    /// The navigation or chat transport rejected a call.
    #[error("transport error: {0}")]
    Transport(String),

    /// A phase transition that the lifecycle does not allow.
    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns true for errors that leave all state untouched and are
    /// reported straight back to the issuing player.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Conflict | Self::NotActive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_are_player_facing() {
        assert_eq!(
            Error::Conflict.to_string(),
            "Already processing a request. Please wait."
        );
        assert_eq!(
            Error::validation("Invalid number of stacks.").to_string(),
            "Invalid number of stacks."
        );
    }

    #[test]
    fn test_is_rejection() {
        assert!(Error::Conflict.is_rejection());
        assert!(Error::validation("bad").is_rejection());
        assert!(!Error::transport("socket closed").is_rejection());
        assert!(
            !Error::RelocationTimeout {
                target: "alice".into(),
                attempts: 10
            }
            .is_rejection()
        );
    }
}
