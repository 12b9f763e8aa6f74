//! Search-index write seam and in-memory reference implementation.
//!
//! The hosted search service is external; the core only ever issues
//! idempotent upserts and deletes through [`SearchIndex`], and clients
//! never write to the index directly. The in-memory implementation also
//! offers the query surface the (out-of-scope) UI layer uses, which the
//! integration tests exercise to check publication consistency.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::projection::ProjectedTestimony;
use crate::testimony::{Court, TestimonyId};

/// Errors from the search-index write API.
///
/// This is the index-synchronization failure class: it is retried inside
/// the publication pipeline and never reaches the caller whose document
/// write triggered the projection.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index is unreachable or overloaded. Transient; retried.
    #[error("Search index unavailable: {message}")]
    Unavailable {
        /// Failure description.
        message: String,
    },

    /// The index rejected the document. Permanent; not retried.
    #[error("Search index rejected the write: {message}")]
    Rejected {
        /// Rejection description.
        message: String,
    },
}

impl IndexError {
    /// Returns true if retrying may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Write API of the faceted search index.
///
/// Both operations are idempotent: upserting the same projection twice,
/// or deleting an absent entry, leaves the index in the same state.
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the entry for the projection's id.
    fn upsert(&self, projection: ProjectedTestimony) -> Result<(), IndexError>;

    /// Remove the entry for an id. Deleting an absent id is a no-op.
    fn delete(&self, id: &TestimonyId) -> Result<(), IndexError>;
}

/// In-memory search index.
///
/// Reference implementation backing tests and embedded use. The
/// inspection methods model the hosted service's query API: facet filter
/// on court, sort on publication time, free-text match on bill id.
#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    entries: RwLock<HashMap<TestimonyId, ProjectedTestimony>>,
}

fn lock_err(context: &'static str) -> IndexError {
    IndexError::Unavailable {
        message: format!("poisoned lock: {context}"),
    }
}

impl InMemorySearchIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for an id, if present.
    ///
    /// # Errors
    /// `Unavailable` if the index lock is poisoned.
    pub fn get(&self, id: &TestimonyId) -> Result<Option<ProjectedTestimony>, IndexError> {
        let entries = self.entries.read().map_err(|_| lock_err("index"))?;
        Ok(entries.get(id).cloned())
    }

    /// Number of indexed entries.
    ///
    /// # Errors
    /// `Unavailable` if the index lock is poisoned.
    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.entries.read().map_err(|_| lock_err("index"))?.len())
    }

    /// Returns true if the index holds no entries.
    ///
    /// # Errors
    /// `Unavailable` if the index lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Entries scoped to a court, newest publication first.
    ///
    /// # Errors
    /// `Unavailable` if the index lock is poisoned.
    pub fn by_court(&self, court: Court) -> Result<Vec<ProjectedTestimony>, IndexError> {
        let entries = self.entries.read().map_err(|_| lock_err("index"))?;
        let mut out: Vec<ProjectedTestimony> = entries
            .values()
            .filter(|p| p.court == court)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(out)
    }

    /// Free-text query over bill ids, case-insensitive substring match.
    ///
    /// # Errors
    /// `Unavailable` if the index lock is poisoned.
    pub fn query(&self, text: &str) -> Result<Vec<ProjectedTestimony>, IndexError> {
        let needle = text.to_ascii_lowercase();
        let entries = self.entries.read().map_err(|_| lock_err("index"))?;
        let mut out: Vec<ProjectedTestimony> = entries
            .values()
            .filter(|p| p.bill_id.as_str().to_ascii_lowercase().contains(&needle))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(out)
    }
}

impl SearchIndex for InMemorySearchIndex {
    fn upsert(&self, projection: ProjectedTestimony) -> Result<(), IndexError> {
        let mut entries = self.entries.write().map_err(|_| lock_err("index"))?;
        entries.insert(projection.id.clone(), projection);
        Ok(())
    }

    fn delete(&self, id: &TestimonyId) -> Result<(), IndexError> {
        let mut entries = self.entries.write().map_err(|_| lock_err("index"))?;
        entries.remove(id);
        Ok(())
    }
}
