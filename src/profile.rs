//! Profile documents and merge-style partial updates.
//!
//! A profile is keyed by its owner's [`UserId`](crate::identity::UserId):
//! exactly one profile per identity, created once by the owner and mutated
//! only by the owner thereafter. The `role` field is special: it is set
//! only through the privileged administrative path and is never writable
//! by the owning client.

use serde::{Deserialize, Serialize};

use crate::identity::Role;

/// A profile document.
///
/// Absence of a profile is a valid, meaningful state and is distinct from
/// a profile that exists with empty fields; stores return `Ok(None)` for
/// the former.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name, mutable by the owner.
    pub full_name: Option<String>,
    /// Contact email, mutable by the owner.
    pub email: Option<String>,
    /// Whether the profile is readable by anyone.
    ///
    /// Defaults to false: a fresh profile is visible only to its owner.
    #[serde(default)]
    pub public: bool,
    /// Role claim, set only by the administrative path.
    pub role: Option<Role>,
}

impl Profile {
    /// Creates an empty, non-public profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Sets the contact email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the public flag.
    #[must_use]
    pub const fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    /// Applies a merge-style patch, producing the proposed document.
    ///
    /// Fields absent from the patch keep their existing value. The result
    /// is what the rule engine evaluates as the proposed state; applying a
    /// patch never commits anything by itself.
    #[must_use]
    pub fn apply(&self, patch: &ProfilePatch) -> Self {
        Self {
            full_name: patch.full_name.clone().or_else(|| self.full_name.clone()),
            email: patch.email.clone().or_else(|| self.email.clone()),
            public: patch.public.unwrap_or(self.public),
            role: patch.role.clone().or_else(|| self.role.clone()),
        }
    }
}

/// Merge-style partial update to a profile.
///
/// `role` is present so that a client attempting to smuggle a role change
/// into an otherwise valid update is detected and denied, rather than
/// silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    /// New display name, if set.
    pub full_name: Option<String>,
    /// New contact email, if set.
    pub email: Option<String>,
    /// New public flag, if set.
    pub public: Option<bool>,
    /// Attempted role write. Always denied for non-privileged requesters.
    pub role: Option<Role>,
}

impl ProfilePatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches the display name.
    #[must_use]
    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Patches the contact email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Patches the public flag.
    #[must_use]
    pub const fn public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    /// Patches the role field.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.public.is_none() && self.role.is_none()
    }
}
