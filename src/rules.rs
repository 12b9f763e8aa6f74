//! Authorization predicates evaluated at the store's transaction boundary.
//!
//! Each predicate is a pure function over `(operation, requester identity,
//! existing document, proposed document)`: no I/O, no clock, no ambient
//! state. The engine evaluates the predicate inline with the commit, so a
//! write either passes its rule and fully applies, or is rejected with no
//! state change.
//!
//! Absence is not denial: a missing document surfaces as
//! [`DenyReason::NoSuchDocument`], which the engine maps to a not-found
//! outcome rather than permission denied.

use thiserror::Error;

use crate::identity::{Identity, UserId};
use crate::profile::Profile;
use crate::testimony::{Testimony, TestimonyStatus};

/// Operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleOp {
    /// Create a document that does not yet exist.
    Create,
    /// Read an existing document.
    Read,
    /// Replace or merge-update an existing document.
    Update,
    /// Remove an existing document.
    Delete,
}

impl std::fmt::Display for RuleOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Read => write!(f, "read"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Why a predicate denied an operation.
///
/// Reasons name the violated invariant, not the caller's intent; the
/// engine maps a subset of them onto the error taxonomy (`NoSuchDocument`
/// becomes not-found, `AlreadyExists` becomes conflicting-state, the rest
/// are permission denials).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    /// The operation requires an authenticated identity.
    #[error("request is not authenticated")]
    Unauthenticated,

    /// The requester does not own the target document.
    #[error("requester does not own this document")]
    NotOwner,

    /// The requester is not the author of the testimony.
    #[error("requester is not the author of this testimony")]
    NotAuthor,

    /// The target document already exists.
    #[error("document already exists")]
    AlreadyExists,

    /// The target document does not exist.
    #[error("document does not exist")]
    NoSuchDocument,

    /// Profile roles are writable only through the administrative path.
    #[error("profile role is not writable by its owner")]
    RoleNotWritable,

    /// Client-facing deletes are forbidden.
    #[error("documents cannot be deleted through the client path")]
    DeleteForbidden,

    /// An identity-key field would change.
    #[error("field '{field}' is immutable")]
    KeyFieldChange {
        /// Name of the immutable field.
        field: &'static str,
    },

    /// The status / published-at combination is inconsistent.
    #[error("inconsistent publication state: {detail}")]
    StatusInconsistent {
        /// What is inconsistent.
        detail: &'static str,
    },

    /// The request shape does not match the operation.
    #[error("malformed request: {detail}")]
    MalformedRequest {
        /// What is missing or superfluous.
        detail: &'static str,
    },
}

/// Outcome of a predicate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The operation may proceed.
    Allow,
    /// The operation is rejected.
    Deny(DenyReason),
}

impl Decision {
    /// Returns true if the decision allows the operation.
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Converts the decision into a `Result`, surfacing the deny reason.
    ///
    /// # Errors
    /// The [`DenyReason`] if the decision is a denial.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}

fn is_admin(requester: Option<&Identity>) -> bool {
    requester.is_some_and(Identity::is_admin)
}

/// Authorization predicate for profile documents.
///
/// `key` is the profile's document key, i.e. the owning identity's id.
/// Rules, per operation:
/// - create: requester must be the key's owner, the document must not
///   exist, and the new document must not carry a role.
/// - read: allowed when the profile is public, for the owner, and for
///   admins. Unauthenticated and third-party reads of non-public profiles
///   are denied.
/// - update: owner-only, and the proposed role must equal the existing
///   role field-for-field; everything else is freely mutable. Admins
///   bypass both checks (the privileged assignment path).
/// - delete: denied for everyone but admins.
#[must_use]
pub fn profile_access(
    op: RuleOp,
    requester: Option<&Identity>,
    key: &UserId,
    existing: Option<&Profile>,
    proposed: Option<&Profile>,
) -> Decision {
    match op {
        RuleOp::Create => {
            let Some(ident) = requester else {
                return Decision::Deny(DenyReason::Unauthenticated);
            };
            let Some(proposed) = proposed else {
                return Decision::Deny(DenyReason::MalformedRequest {
                    detail: "create requires a proposed document",
                });
            };
            if ident.uid != *key {
                return Decision::Deny(DenyReason::NotOwner);
            }
            if existing.is_some() {
                return Decision::Deny(DenyReason::AlreadyExists);
            }
            if proposed.role.is_some() && !ident.is_admin() {
                return Decision::Deny(DenyReason::RoleNotWritable);
            }
            Decision::Allow
        }

        RuleOp::Read => {
            let Some(existing) = existing else {
                return Decision::Deny(DenyReason::NoSuchDocument);
            };
            if existing.public {
                return Decision::Allow;
            }
            let Some(ident) = requester else {
                return Decision::Deny(DenyReason::Unauthenticated);
            };
            if ident.is_admin() || ident.uid == *key {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }

        RuleOp::Update => {
            let Some(existing) = existing else {
                return Decision::Deny(DenyReason::NoSuchDocument);
            };
            let Some(proposed) = proposed else {
                return Decision::Deny(DenyReason::MalformedRequest {
                    detail: "update requires a proposed document",
                });
            };
            let Some(ident) = requester else {
                return Decision::Deny(DenyReason::Unauthenticated);
            };
            if ident.is_admin() {
                return Decision::Allow;
            }
            if ident.uid != *key {
                return Decision::Deny(DenyReason::NotOwner);
            }
            // Field-level diff: the role field alone is frozen.
            if proposed.role != existing.role {
                return Decision::Deny(DenyReason::RoleNotWritable);
            }
            Decision::Allow
        }

        RuleOp::Delete => {
            if existing.is_none() {
                return Decision::Deny(DenyReason::NoSuchDocument);
            }
            if is_admin(requester) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::DeleteForbidden)
            }
        }
    }
}

/// Authorization predicate for testimony documents.
///
/// Rules, per operation:
/// - create: requester must be the proposed document's author, the
///   document must not exist, and new testimony always starts as a draft.
/// - read: published testimony is readable by anyone, including
///   unauthenticated requesters; drafts only by their author or an admin.
/// - update: author-only (admins bypass authorship). The identity-key
///   fields (`id`, `author`, `bill_id`, `court`) are immutable, and the
///   publication timestamp must be consistent with the proposed status.
/// - delete: denied for everyone but admins; de-scoping is a retraction,
///   not a delete.
#[must_use]
pub fn testimony_access(
    op: RuleOp,
    requester: Option<&Identity>,
    existing: Option<&Testimony>,
    proposed: Option<&Testimony>,
) -> Decision {
    match op {
        RuleOp::Create => {
            let Some(ident) = requester else {
                return Decision::Deny(DenyReason::Unauthenticated);
            };
            let Some(proposed) = proposed else {
                return Decision::Deny(DenyReason::MalformedRequest {
                    detail: "create requires a proposed document",
                });
            };
            if ident.uid != proposed.author {
                return Decision::Deny(DenyReason::NotAuthor);
            }
            if existing.is_some() {
                return Decision::Deny(DenyReason::AlreadyExists);
            }
            if proposed.status != TestimonyStatus::Draft || proposed.published_at.is_some() {
                return Decision::Deny(DenyReason::StatusInconsistent {
                    detail: "new testimony must start as a draft",
                });
            }
            Decision::Allow
        }

        RuleOp::Read => {
            let Some(existing) = existing else {
                return Decision::Deny(DenyReason::NoSuchDocument);
            };
            if existing.is_published() {
                return Decision::Allow;
            }
            let Some(ident) = requester else {
                return Decision::Deny(DenyReason::Unauthenticated);
            };
            if ident.is_admin() || ident.uid == existing.author {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotAuthor)
            }
        }

        RuleOp::Update => {
            let Some(existing) = existing else {
                return Decision::Deny(DenyReason::NoSuchDocument);
            };
            let Some(proposed) = proposed else {
                return Decision::Deny(DenyReason::MalformedRequest {
                    detail: "update requires a proposed document",
                });
            };
            let Some(ident) = requester else {
                return Decision::Deny(DenyReason::Unauthenticated);
            };
            if !ident.is_admin() && ident.uid != existing.author {
                return Decision::Deny(DenyReason::NotAuthor);
            }
            if proposed.id != existing.id {
                return Decision::Deny(DenyReason::KeyFieldChange { field: "id" });
            }
            if proposed.author != existing.author {
                return Decision::Deny(DenyReason::KeyFieldChange { field: "author" });
            }
            if proposed.bill_id != existing.bill_id {
                return Decision::Deny(DenyReason::KeyFieldChange { field: "bill_id" });
            }
            if proposed.court != existing.court {
                return Decision::Deny(DenyReason::KeyFieldChange { field: "court" });
            }
            match (proposed.status, proposed.published_at) {
                (TestimonyStatus::Published, None) => {
                    Decision::Deny(DenyReason::StatusInconsistent {
                        detail: "published testimony must carry a publication time",
                    })
                }
                (TestimonyStatus::Draft, Some(_)) => {
                    Decision::Deny(DenyReason::StatusInconsistent {
                        detail: "draft testimony cannot carry a publication time",
                    })
                }
                _ => Decision::Allow,
            }
        }

        RuleOp::Delete => {
            if existing.is_none() {
                return Decision::Deny(DenyReason::NoSuchDocument);
            }
            if is_admin(requester) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::DeleteForbidden)
            }
        }
    }
}
