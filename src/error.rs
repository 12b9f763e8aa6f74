//! Error types for Rostra.
//!
//! All errors are strongly typed using thiserror. The taxonomy mirrors
//! the outcomes a caller must be able to distinguish: an absent document
//! (`NotFound`) is never reported as a denial (`PermissionDenied`), and a
//! violated lifecycle invariant (`ConflictingState`) is neither.
//!
//! Index-synchronization failures are deliberately absent here: they are
//! retried inside the publication pipeline and never propagate to the
//! caller whose write triggered them (see [`crate::index::IndexError`]).

use thiserror::Error;

use crate::rules::DenyReason;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("User id cannot be empty")]
    EmptyUserId,

    #[error("Bill id cannot be empty")]
    EmptyBillId,

    #[error("Testimony content is {size} bytes, exceeding the maximum of {max}")]
    ContentTooLarge { size: usize, max: usize },
}

/// Top-level error type for Rostra operations.
#[derive(Debug, Error)]
pub enum RostraError {
    /// Requested document key has no value. Distinct from denial.
    #[error("Not found: {collection}/{key}")]
    NotFound {
        /// Collection the key was resolved against.
        collection: &'static str,
        /// The missing document key.
        key: String,
    },

    /// The requester failed a rule-engine predicate.
    #[error("Permission denied: {reason}")]
    PermissionDenied {
        /// The violated invariant.
        reason: DenyReason,
    },

    /// An attempted transition violates a lifecycle invariant.
    #[error("Conflicting state: {reason}")]
    ConflictingState {
        /// The invariant the transition would violate.
        reason: String,
    },

    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The document store backend failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Backend failure description.
        message: String,
    },
}

impl RostraError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(collection: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            key: key.into(),
        }
    }

    /// Creates a conflicting-state error.
    #[must_use]
    pub fn conflicting(reason: impl Into<String>) -> Self {
        Self::ConflictingState {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a permission denial.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Returns true if this is a conflicting-state error.
    #[must_use]
    pub const fn is_conflicting_state(&self) -> bool {
        matches!(self, Self::ConflictingState { .. })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for Rostra operations.
pub type RostraResult<T> = Result<T, RostraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RostraError::not_found("profiles", "user-1");
        let msg = format!("{err}");
        assert!(msg.contains("profiles/user-1"));
        assert!(err.is_not_found());
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_permission_denied_display() {
        let err = RostraError::PermissionDenied {
            reason: DenyReason::RoleNotWritable,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Permission denied"));
        assert!(msg.contains("role"));
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_conflicting_state_display() {
        let err = RostraError::conflicting("profile already exists");
        assert!(format!("{err}").contains("profile already exists"));
        assert!(err.is_conflicting_state());
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: RostraError = ValidationError::EmptyBillId.into();
        assert!(err.is_validation());
        assert!(format!("{err}").contains("Bill id"));
    }

    #[test]
    fn test_content_too_large_display() {
        let err = ValidationError::ContentTooLarge {
            size: 40_000,
            max: 32_768,
        };
        let msg = format!("{err}");
        assert!(msg.contains("40000"));
        assert!(msg.contains("32768"));
    }
}
