//! Denormalized search-index projections of published testimony.
//!
//! A projection carries the subset of fields the search surface filters
//! and sorts on. It is derived, never authoritative: the pipeline can
//! recompute it from the document store at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::testimony::{BillId, Court, Testimony, TestimonyId};

/// Denormalized copy of a published testimony for the search index.
///
/// Keyed by the same logical id as the authoritative document. The
/// author's display name is denormalized from their profile at projection
/// time so search results can be rendered without a profile read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedTestimony {
    /// Shared logical key with the authoritative document.
    pub id: TestimonyId,
    /// Bill the testimony addresses; the free-text query target.
    pub bill_id: BillId,
    /// Legislative session; the facet filter value.
    pub court: Court,
    /// Authoring identity.
    pub author: UserId,
    /// Author display name at projection time, if their profile had one.
    pub author_display_name: Option<String>,
    /// Publication timestamp; the sort key.
    pub published_at: DateTime<Utc>,
}

impl ProjectedTestimony {
    /// Projects a testimony document, if it is published.
    ///
    /// Returns `None` for drafts: non-published testimony must never have
    /// an index entry, so there is nothing to project.
    #[must_use]
    pub fn project(testimony: &Testimony, author_display_name: Option<String>) -> Option<Self> {
        let published_at = testimony.published_at?;
        if !testimony.is_published() {
            return None;
        }
        Some(Self {
            id: testimony.id.clone(),
            bill_id: testimony.bill_id.clone(),
            court: testimony.court,
            author: testimony.author.clone(),
            author_display_name,
            published_at,
        })
    }
}
