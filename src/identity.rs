//! Requester identity and role claims.
//!
//! Identities are issued by an external identity provider and carry a
//! stable unique id plus optional custom claims. The core never keeps an
//! ambient "current user"; every store operation receives the requester
//! explicitly (`Option<&Identity>`, with `None` meaning unauthenticated).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, unique identifier for an authenticated principal.
///
/// The identity provider owns the format of these ids; the core treats
/// them as opaque strings and only ever compares them for equality.
///
/// # Examples
///
/// ```
/// use rostra::UserId;
///
/// let id = UserId::new("user-7Hq2");
/// assert_eq!(id.as_str(), "user-7Hq2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from a provider-issued string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Role claim attached to an identity or profile.
///
/// Roles are assigned only through the privileged administrative path;
/// an owning client can never set or change its own role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator; may use the privileged write path.
    Admin,
    /// A verified legislator account.
    Legislator,
    /// A verified organization account.
    Organization,
    /// A custom role claim.
    Custom(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Legislator => write!(f, "legislator"),
            Self::Organization => write!(f, "organization"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// An authenticated principal as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable unique id.
    pub uid: UserId,
    /// Optional role claim.
    pub role: Option<Role>,
}

impl Identity {
    /// Creates an identity with no role claim.
    #[must_use]
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            role: None,
        }
    }

    /// Attaches a role claim.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Returns true if this identity carries the admin claim.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Some(Role::Admin))
    }
}
