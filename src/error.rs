//! Error types for the intake tracking core.

use thiserror::Error;

use crate::domain::pvz::{PvzId, Role};
use crate::domain::reception::ReceptionId;

/// Result type alias using the priemka error type.
pub type Result<T> = std::result::Result<T, PriemkaError>;

/// Main error type for the intake tracking core.
///
/// Variants carry the identifiers they concern so callers can log and report
/// them without re-deriving context. [`PriemkaError::kind`] collapses the
/// variants onto the transport-facing taxonomy.
#[derive(Error, Debug)]
pub enum PriemkaError {
    /// City is not in the configured allow-list.
    #[error("city is not a valid pickup point location: {0}")]
    InvalidLocation(String),

    /// Malformed input (bad identifier, unparsable date, empty field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Pickup point does not exist.
    #[error("pickup point not found: {0}")]
    PvzNotFound(PvzId),

    /// No open reception for the pickup point.
    #[error("no open reception for pickup point {0}")]
    NoOpenReception(PvzId),

    /// Reception is no longer open; intake mutations are frozen.
    #[error("reception {0} is not open")]
    ReceptionClosed(ReceptionId),

    /// Reception has no products left to operate on.
    #[error("reception {0} has no products")]
    NoProducts(ReceptionId),

    /// No account registered under this email.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// An open reception already exists for the pickup point.
    #[error("an open reception already exists for pickup point {0}")]
    OpenReceptionExists(PvzId),

    /// An account is already registered under this email.
    #[error("user already registered: {0}")]
    UserExists(String),

    /// Caller role is not allowed to perform the operation.
    #[error("role {role} is not allowed to {operation}")]
    Forbidden {
        role: Role,
        operation: &'static str,
    },

    /// Store I/O failure. Never retried by the core; surfaced immediately.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),

    /// General error from anyhow.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Transport-facing error classification.
///
/// Presentation layers map these to status codes; the core preserves the
/// specific variant alongside the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Forbidden,
    Unavailable,
    Internal,
}

impl PriemkaError {
    /// Classify this error for the presentation layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PriemkaError::InvalidLocation(_) | PriemkaError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            PriemkaError::PvzNotFound(_)
            | PriemkaError::NoOpenReception(_)
            | PriemkaError::NoProducts(_)
            | PriemkaError::UserNotFound(_) => ErrorKind::NotFound,
            PriemkaError::OpenReceptionExists(_)
            | PriemkaError::ReceptionClosed(_)
            | PriemkaError::UserExists(_) => ErrorKind::Conflict,
            PriemkaError::Forbidden { .. } => ErrorKind::Forbidden,
            PriemkaError::Unavailable(_) => ErrorKind::Unavailable,
            PriemkaError::Other(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn kind_maps_lookup_failures_to_not_found() {
        let pvz_id = PvzId::from(Uuid::new_v4());
        assert_eq!(
            PriemkaError::NoOpenReception(pvz_id).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PriemkaError::UserNotFound("a@b".into()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn kind_maps_duplicate_open_reception_to_conflict() {
        let pvz_id = PvzId::from(Uuid::new_v4());
        assert_eq!(
            PriemkaError::OpenReceptionExists(pvz_id).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn kind_maps_bad_city_to_invalid_input() {
        assert_eq!(
            PriemkaError::InvalidLocation("Тверь".into()).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn forbidden_message_names_role_and_operation() {
        let err = PriemkaError::Forbidden {
            role: Role::Employee,
            operation: "create a pickup point",
        };
        assert_eq!(
            err.to_string(),
            "role employee is not allowed to create a pickup point"
        );
    }
}
