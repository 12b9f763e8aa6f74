//! Testimony documents and their publication state machine.
//!
//! A testimony document is keyed by (court, bill, author): one document
//! per author per bill per legislative session. The payload is opaque to
//! the core; only `status`, `court` and `published_at` participate in the
//! access-control and publication-consistency rules.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::UserId;

/// Maximum serialized size of a testimony payload, in bytes.
pub const MAX_CONTENT_BYTES: usize = 32 * 1024;

/// Legislative session (general court) number used for scoping.
///
/// The session a testimony is filed under is a server-trusted value: the
/// engine stamps it from its configuration, never from client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Court(u16);

impl Court {
    /// Creates a court from a session number.
    #[must_use]
    pub const fn new(session: u16) -> Self {
        Self(session)
    }

    /// Returns the session number.
    #[must_use]
    pub const fn session(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Court {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the bill a testimony addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(String);

impl BillId {
    /// Creates a bill id.
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

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BillId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable testimony document key.
///
/// Derived from (court, bill, author) with a stable hash, so the same
/// triple always maps to the same document and the search index entry for
/// a testimony shares its key with the authoritative document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestimonyId(String);

impl TestimonyId {
    /// Derives the id for a (court, bill, author) triple.
    #[must_use]
    pub fn derive(court: Court, bill: &BillId, author: &UserId) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(court.session().to_string().as_bytes());
        hasher.update(b"/");
        hasher.update(bill.as_str().as_bytes());
        hasher.update(b"/");
        hasher.update(author.as_str().as_bytes());
        let hex = hasher.finalize().to_hex();
        Self(hex[..32].to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestimonyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication state of a testimony document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestimonyStatus {
    /// Visible only to the author; absent from the search index.
    Draft,
    /// Publicly readable and projected into the search index.
    Published,
}

impl fmt::Display for TestimonyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

/// A testimony document.
///
/// `published_at` is present exactly when `status` is
/// [`TestimonyStatus::Published`]; the transition methods maintain that
/// invariant and the rule engine rejects writes that would break it.
/// `version` increments on every committed write and orders projections
/// in the publication pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimony {
    /// Stable document key.
    pub id: TestimonyId,
    /// Authoring identity. Immutable after creation.
    pub author: UserId,
    /// Bill the testimony addresses. Immutable after creation.
    pub bill_id: BillId,
    /// Legislative session. Immutable after creation, server-stamped.
    pub court: Court,
    /// Publication state.
    pub status: TestimonyStatus,
    /// Publication timestamp; present only once published.
    pub published_at: Option<DateTime<Utc>>,
    /// Opaque payload.
    pub content: serde_json::Value,
    /// Per-document write sequence number.
    pub version: u64,
}

impl Testimony {
    /// Creates a new draft for the given (court, bill, author) triple.
    ///
    /// # Errors
    /// - [`ValidationError::EmptyUserId`] if the author id is empty
    /// - [`ValidationError::EmptyBillId`] if the bill id is empty
    /// - [`ValidationError::ContentTooLarge`] if the payload exceeds
    ///   [`MAX_CONTENT_BYTES`]
    pub fn draft(
        author: UserId,
        bill_id: BillId,
        court: Court,
        content: serde_json::Value,
    ) -> Result<Self, ValidationError> {
        if author.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        if bill_id.is_empty() {
            return Err(ValidationError::EmptyBillId);
        }
        validate_content(&content)?;

        let id = TestimonyId::derive(court, &bill_id, &author);
        Ok(Self {
            id,
            author,
            bill_id,
            court,
            status: TestimonyStatus::Draft,
            published_at: None,
            content,
            version: 1,
        })
    }

    /// Returns true if the document is published.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self.status, TestimonyStatus::Published)
    }

    /// Transitions to published, stamping the publication time.
    ///
    /// Republishing an already-published document refreshes the stamp.
    pub fn publish(&mut self, at: DateTime<Utc>) {
        self.status = TestimonyStatus::Published;
        self.published_at = Some(at);
    }

    /// Transitions back to draft, clearing the publication time.
    pub fn retract(&mut self) {
        self.status = TestimonyStatus::Draft;
        self.published_at = None;
    }

    /// Replaces the payload.
    ///
    /// # Errors
    /// [`ValidationError::ContentTooLarge`] if the payload exceeds
    /// [`MAX_CONTENT_BYTES`].
    pub fn set_content(&mut self, content: serde_json::Value) -> Result<(), ValidationError> {
        validate_content(&content)?;
        self.content = content;
        Ok(())
    }
}

fn validate_content(content: &serde_json::Value) -> Result<(), ValidationError> {
    let size = content.to_string().len();
    if size > MAX_CONTENT_BYTES {
        return Err(ValidationError::ContentTooLarge {
            size,
            max: MAX_CONTENT_BYTES,
        });
    }
    Ok(())
}
