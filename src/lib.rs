//! # Rostra - Testimony Access Control & Publication Consistency
//!
//! Rostra is the document access-control and publication-consistency core
//! of a legislative-testimony tracking service: citizens submit written
//! testimony on bills, and the system makes published testimony publicly
//! searchable while keeping drafts and private profiles locked down.
//!
//! ## Core Concepts
//!
//! - **Identity**: a stable principal issued by the identity provider
//! - **Rule predicates**: pure allow/deny functions evaluated at the
//!   store's transaction boundary
//! - **Profile lifecycle**: created once by its owner, owner-mutated,
//!   never client-deleted, role assigned only via the privileged path
//! - **Publication pipeline**: a worker that keeps the search index
//!   holding exactly the published testimony, with idempotent upserts
//!   and deletes and bounded retries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rostra::{
//!     BillId, Court, Identity, InMemorySearchIndex, InMemoryStores,
//!     PipelineConfig, Profile, PublicationPipeline, RostraEngine,
//! };
//!
//! let stores = InMemoryStores::default();
//! let profiles = Arc::new(stores.profiles);
//! let testimonies = Arc::new(stores.testimonies);
//! let index = Arc::new(InMemorySearchIndex::new());
//!
//! let pipeline = PublicationPipeline::new(
//!     PipelineConfig::default(),
//!     index.clone(),
//!     profiles.clone(),
//! );
//! let engine = RostraEngine::new(profiles, testimonies, Court::new(193))
//!     .with_publication(pipeline.feed());
//!
//! let alice = Identity::new("alice");
//! engine.create_profile(Some(&alice), &alice.uid, Profile::new())?;
//! let testimony = engine.submit_testimony(
//!     Some(&alice),
//!     &BillId::from("H.1234"),
//!     serde_json::json!({ "text": "I support this bill." }),
//! )?;
//! engine.publish_testimony(Some(&alice), &testimony.id)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod identity;
pub mod index;
pub mod pipeline;
pub mod profile;
pub mod projection;
pub mod rules;
pub mod storage;
pub mod testimony;

// Re-export primary types at crate root for convenience
pub use engine::RostraEngine;
pub use error::{RostraError, RostraResult, ValidationError};
pub use identity::{Identity, Role, UserId};
pub use index::{IndexError, InMemorySearchIndex, SearchIndex};
pub use pipeline::{
    ChangeFeed, PipelineConfig, PublicationPipeline, RetryPolicy, TestimonyChange,
};
pub use profile::{Profile, ProfilePatch};
pub use projection::ProjectedTestimony;
pub use rules::{profile_access, testimony_access, Decision, DenyReason, RuleOp};
pub use storage::{
    InMemoryProfileStore, InMemoryStores, InMemoryTestimonyStore, ProfileStore, StorageError,
    TestimonyStore,
};
pub use testimony::{BillId, Court, Testimony, TestimonyId, TestimonyStatus};
