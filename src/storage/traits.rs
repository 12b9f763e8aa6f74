//! Abstract storage traits for the authoritative document store.
//!
//! By using traits, we enable:
//! - In-memory backends for testing and embedded use
//! - Hosted document-database backends in production
//!
//! Writes to a single key are serialized by the backend and commit
//! atomically; there is no client-visible partial write.

use thiserror::Error;

use crate::identity::UserId;
use crate::profile::Profile;
use crate::testimony::{Testimony, TestimonyId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Profile row not found.
    #[error("Profile not found: {0}")]
    ProfileNotFound(UserId),

    /// Testimony row not found.
    #[error("Testimony not found: {0}")]
    TestimonyNotFound(TestimonyId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Storage trait for profile documents, keyed by owner id.
///
/// # Safety Considerations
/// - All mutations must be atomic per key
/// - Implementations must handle concurrent access safely
pub trait ProfileStore: Send + Sync {
    /// Insert a new profile. Returns `DuplicateKey` if one exists.
    fn insert(&self, uid: &UserId, profile: Profile) -> Result<(), StorageError>;

    /// Get a profile by owner id. `Ok(None)` means no profile exists,
    /// which is a meaningful state distinct from an empty profile.
    fn get(&self, uid: &UserId) -> Result<Option<Profile>, StorageError>;

    /// Replace an existing profile. Returns `ProfileNotFound` if absent.
    fn put(&self, uid: &UserId, profile: Profile) -> Result<(), StorageError>;

    /// Remove a profile. Returns `ProfileNotFound` if absent.
    fn remove(&self, uid: &UserId) -> Result<(), StorageError>;
}

/// Storage trait for testimony documents, keyed by derived id.
pub trait TestimonyStore: Send + Sync {
    /// Insert a new testimony. Returns `DuplicateKey` if one exists.
    fn insert(&self, testimony: Testimony) -> Result<(), StorageError>;

    /// Get a testimony by id.
    fn get(&self, id: &TestimonyId) -> Result<Option<Testimony>, StorageError>;

    /// Replace an existing testimony. Returns `TestimonyNotFound` if absent.
    fn put(&self, testimony: Testimony) -> Result<(), StorageError>;

    /// Remove a testimony. Returns `TestimonyNotFound` if absent.
    fn remove(&self, id: &TestimonyId) -> Result<(), StorageError>;

    /// Find all testimony documents by a given author.
    fn find_by_author(&self, author: &UserId) -> Result<Vec<Testimony>, StorageError>;
}
