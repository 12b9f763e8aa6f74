//! Rule-checked execution engine over the document store.
//!
//! `RostraEngine` is the transaction boundary: every client-facing
//! operation resolves current state, builds the proposed state, evaluates
//! the matching rule predicate, and only then commits — so a write either
//! fully applies or is rejected with no state change. Committed testimony
//! writes are fed to the publication pipeline after the commit; index
//! failures can therefore never affect the authoritative write.
//!
//! The profile operations implement the lifecycle
//! `Absent → Created(owner) → Updated(owner)*`: creation happens exactly
//! once per identity, only the owner mutates thereafter, and no client
//! action transitions a profile back to absent. Role assignment is the
//! one privileged transition, reachable only with an admin claim.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{RostraError, RostraResult, ValidationError};
use crate::identity::{Identity, Role, UserId};
use crate::pipeline::{ChangeFeed, TestimonyChange};
use crate::profile::{Profile, ProfilePatch};
use crate::rules::{profile_access, testimony_access, DenyReason, RuleOp};
use crate::storage::{ProfileStore, StorageError, TestimonyStore};
use crate::testimony::{BillId, Court, Testimony, TestimonyId};

const PROFILES: &str = "profiles";
const TESTIMONY: &str = "testimony";

/// Rule-checked document engine.
#[derive(Clone)]
pub struct RostraEngine {
    profiles: Arc<dyn ProfileStore>,
    testimonies: Arc<dyn TestimonyStore>,
    current_court: Court,
    feed: Option<ChangeFeed>,
}

impl RostraEngine {
    /// Creates an engine over the given stores.
    ///
    /// `current_court` is the server-trusted legislative session new
    /// testimony is filed under; client input never selects it.
    #[must_use]
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        testimonies: Arc<dyn TestimonyStore>,
        current_court: Court,
    ) -> Self {
        Self {
            profiles,
            testimonies,
            current_court,
            feed: None,
        }
    }

    /// Attaches a publication-pipeline feed.
    ///
    /// Without a feed the engine still enforces all rules; the search
    /// index simply receives no projections (embedded/test use).
    #[must_use]
    pub fn with_publication(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// The session new testimony is currently filed under.
    #[must_use]
    pub const fn current_court(&self) -> Court {
        self.current_court
    }

    fn storage_err(err: StorageError) -> RostraError {
        RostraError::Storage {
            message: err.to_string(),
        }
    }

    /// Maps a rule denial onto the error taxonomy for a given document.
    ///
    /// `NoSuchDocument` and `AlreadyExists` describe document state, not
    /// requester permissions, so they surface as `NotFound` and
    /// `ConflictingState`; everything else is a permission denial.
    fn deny(collection: &'static str, key: &str, reason: DenyReason) -> RostraError {
        match reason {
            DenyReason::NoSuchDocument => RostraError::not_found(collection, key),
            DenyReason::AlreadyExists => {
                RostraError::conflicting(format!("{collection}/{key} already exists"))
            }
            other => RostraError::PermissionDenied { reason: other },
        }
    }

    fn emit(&self, change: TestimonyChange) {
        if let Some(feed) = &self.feed {
            feed.submit(change);
        }
    }

    // --- profile lifecycle ---

    /// Creates the profile at `uid`. Allowed exactly once, for the
    /// owning identity.
    ///
    /// # Errors
    /// - `Validation` if `uid` is empty
    /// - `PermissionDenied` if the requester is not the key's owner, is
    ///   unauthenticated, or the new profile carries a role
    /// - `ConflictingState` if a profile already exists at `uid`
    pub fn create_profile(
        &self,
        requester: Option<&Identity>,
        uid: &UserId,
        profile: Profile,
    ) -> RostraResult<Profile> {
        if uid.is_empty() {
            return Err(ValidationError::EmptyUserId.into());
        }

        let existing = self.profiles.get(uid).map_err(Self::storage_err)?;
        profile_access(RuleOp::Create, requester, uid, existing.as_ref(), Some(&profile))
            .into_result()
            .map_err(|r| Self::deny(PROFILES, uid.as_str(), r))?;

        match self.profiles.insert(uid, profile.clone()) {
            Ok(()) => Ok(profile),
            // Lost a create race after the rule check; same outcome as a
            // straight duplicate create.
            Err(StorageError::DuplicateKey(key)) => {
                Err(RostraError::conflicting(format!("{PROFILES}/{key} already exists")))
            }
            Err(err) => Err(Self::storage_err(err)),
        }
    }

    /// Reads the profile at `uid`.
    ///
    /// # Errors
    /// - `NotFound` if no profile exists at `uid`
    /// - `PermissionDenied` for unauthenticated or third-party reads of a
    ///   non-public profile
    pub fn get_profile(&self, requester: Option<&Identity>, uid: &UserId) -> RostraResult<Profile> {
        let existing = self.profiles.get(uid).map_err(Self::storage_err)?;
        profile_access(RuleOp::Read, requester, uid, existing.as_ref(), None)
            .into_result()
            .map_err(|r| Self::deny(PROFILES, uid.as_str(), r))?;
        existing.ok_or_else(|| RostraError::not_found(PROFILES, uid.as_str()))
    }

    /// Merge-updates the profile at `uid`.
    ///
    /// # Errors
    /// - `NotFound` if no profile exists at `uid`
    /// - `PermissionDenied` if the requester is not the owner, or the
    ///   patch would change the role field
    pub fn update_profile(
        &self,
        requester: Option<&Identity>,
        uid: &UserId,
        patch: &ProfilePatch,
    ) -> RostraResult<Profile> {
        let existing = self.profiles.get(uid).map_err(Self::storage_err)?;
        let proposed = existing.as_ref().map(|e| e.apply(patch));

        profile_access(
            RuleOp::Update,
            requester,
            uid,
            existing.as_ref(),
            proposed.as_ref(),
        )
        .into_result()
        .map_err(|r| Self::deny(PROFILES, uid.as_str(), r))?;

        let updated = proposed.ok_or_else(|| RostraError::not_found(PROFILES, uid.as_str()))?;
        self.profiles
            .put(uid, updated.clone())
            .map_err(Self::storage_err)?;
        Ok(updated)
    }

    /// Deletes the profile at `uid`. Admin-only; profiles are never
    /// destroyed through the client-facing path.
    ///
    /// # Errors
    /// - `NotFound` if no profile exists at `uid`
    /// - `PermissionDenied` for every non-admin requester, the owner
    ///   included
    pub fn delete_profile(&self, requester: Option<&Identity>, uid: &UserId) -> RostraResult<()> {
        let existing = self.profiles.get(uid).map_err(Self::storage_err)?;
        profile_access(RuleOp::Delete, requester, uid, existing.as_ref(), None)
            .into_result()
            .map_err(|r| Self::deny(PROFILES, uid.as_str(), r))?;
        self.profiles.remove(uid).map_err(Self::storage_err)
    }

    /// Assigns a role to the profile at `uid`.
    ///
    /// This is the privileged administrative path: it requires the admin
    /// claim and is the only transition that writes the role field. It is
    /// unreachable from an owner's self-update.
    ///
    /// # Errors
    /// - `NotFound` if no profile exists at `uid`
    /// - `PermissionDenied` if `actor` lacks the admin claim
    pub fn assign_role(&self, actor: &Identity, uid: &UserId, role: Role) -> RostraResult<Profile> {
        let existing = self.profiles.get(uid).map_err(Self::storage_err)?;
        let proposed = existing.as_ref().map(|e| Profile {
            role: Some(role),
            ..e.clone()
        });

        profile_access(
            RuleOp::Update,
            Some(actor),
            uid,
            existing.as_ref(),
            proposed.as_ref(),
        )
        .into_result()
        .map_err(|r| Self::deny(PROFILES, uid.as_str(), r))?;

        let updated = proposed.ok_or_else(|| RostraError::not_found(PROFILES, uid.as_str()))?;
        self.profiles
            .put(uid, updated.clone())
            .map_err(Self::storage_err)?;
        Ok(updated)
    }

    // --- testimony ---

    /// Submits testimony on a bill for the current court.
    ///
    /// Creates a draft keyed by (current court, bill, requester); the
    /// court is stamped from engine configuration. Re-submitting for the
    /// same bill and court updates the existing document's content
    /// instead of creating a second one.
    ///
    /// # Errors
    /// - `PermissionDenied` if unauthenticated
    /// - `Validation` for an empty bill id or oversized content
    pub fn submit_testimony(
        &self,
        requester: Option<&Identity>,
        bill_id: &BillId,
        content: serde_json::Value,
    ) -> RostraResult<Testimony> {
        let Some(ident) = requester else {
            return Err(RostraError::PermissionDenied {
                reason: DenyReason::Unauthenticated,
            });
        };
        if bill_id.is_empty() {
            return Err(ValidationError::EmptyBillId.into());
        }

        let id = TestimonyId::derive(self.current_court, bill_id, &ident.uid);
        let existing = self.testimonies.get(&id).map_err(Self::storage_err)?;

        if let Some(existing) = existing {
            let mut proposed = existing.clone();
            proposed.set_content(content)?;
            proposed.version += 1;

            testimony_access(RuleOp::Update, requester, Some(&existing), Some(&proposed))
                .into_result()
                .map_err(|r| Self::deny(TESTIMONY, id.as_str(), r))?;

            self.testimonies
                .put(proposed.clone())
                .map_err(Self::storage_err)?;
            self.emit(TestimonyChange::updated(proposed.clone()));
            return Ok(proposed);
        }

        let draft = Testimony::draft(
            ident.uid.clone(),
            bill_id.clone(),
            self.current_court,
            content,
        )?;

        testimony_access(RuleOp::Create, requester, None, Some(&draft))
            .into_result()
            .map_err(|r| Self::deny(TESTIMONY, id.as_str(), r))?;

        match self.testimonies.insert(draft.clone()) {
            Ok(()) => {
                self.emit(TestimonyChange::updated(draft.clone()));
                Ok(draft)
            }
            Err(StorageError::DuplicateKey(key)) => {
                Err(RostraError::conflicting(format!("{TESTIMONY}/{key} already exists")))
            }
            Err(err) => Err(Self::storage_err(err)),
        }
    }

    /// Reads a testimony document.
    ///
    /// # Errors
    /// - `NotFound` if no document exists at `id`
    /// - `PermissionDenied` for non-author reads of a draft
    pub fn get_testimony(
        &self,
        requester: Option<&Identity>,
        id: &TestimonyId,
    ) -> RostraResult<Testimony> {
        let existing = self.testimonies.get(id).map_err(Self::storage_err)?;
        testimony_access(RuleOp::Read, requester, existing.as_ref(), None)
            .into_result()
            .map_err(|r| Self::deny(TESTIMONY, id.as_str(), r))?;
        existing.ok_or_else(|| RostraError::not_found(TESTIMONY, id.as_str()))
    }

    /// Replaces a testimony's content without changing its status.
    ///
    /// # Errors
    /// - `NotFound` if no document exists at `id`
    /// - `PermissionDenied` if the requester is not the author
    /// - `Validation` for oversized content
    pub fn edit_testimony(
        &self,
        requester: Option<&Identity>,
        id: &TestimonyId,
        content: serde_json::Value,
    ) -> RostraResult<Testimony> {
        self.transition(requester, id, |proposed| proposed.set_content(content))
    }

    /// Publishes a testimony, stamping the publication time server-side.
    /// Republishing refreshes the stamp.
    ///
    /// # Errors
    /// - `NotFound` if no document exists at `id`
    /// - `PermissionDenied` if the requester is not the author
    pub fn publish_testimony(
        &self,
        requester: Option<&Identity>,
        id: &TestimonyId,
    ) -> RostraResult<Testimony> {
        self.transition(requester, id, |proposed| {
            proposed.publish(Utc::now());
            Ok(())
        })
    }

    /// Retracts a testimony back to draft, removing it from public view.
    /// The pipeline deletes its index entry.
    ///
    /// # Errors
    /// - `NotFound` if no document exists at `id`
    /// - `PermissionDenied` if the requester is not the author
    pub fn retract_testimony(
        &self,
        requester: Option<&Identity>,
        id: &TestimonyId,
    ) -> RostraResult<Testimony> {
        self.transition(requester, id, |proposed| {
            proposed.retract();
            Ok(())
        })
    }

    /// Removes a testimony document outright. Admin-only.
    ///
    /// # Errors
    /// - `NotFound` if no document exists at `id`
    /// - `PermissionDenied` for every non-admin requester, the author
    ///   included
    pub fn delete_testimony(
        &self,
        requester: Option<&Identity>,
        id: &TestimonyId,
    ) -> RostraResult<()> {
        let existing = self.testimonies.get(id).map_err(Self::storage_err)?;
        testimony_access(RuleOp::Delete, requester, existing.as_ref(), None)
            .into_result()
            .map_err(|r| Self::deny(TESTIMONY, id.as_str(), r))?;

        let Some(existing) = existing else {
            return Err(RostraError::not_found(TESTIMONY, id.as_str()));
        };
        self.testimonies.remove(id).map_err(Self::storage_err)?;
        self.emit(TestimonyChange::removed(id.clone(), existing.version + 1));
        Ok(())
    }

    /// Lists an author's testimony, filtered by what the requester may
    /// read: the author (and admins) see everything, everyone else only
    /// published documents.
    ///
    /// # Errors
    /// `Storage` if the backend fails.
    pub fn list_testimony(
        &self,
        requester: Option<&Identity>,
        author: &UserId,
    ) -> RostraResult<Vec<Testimony>> {
        let all = self
            .testimonies
            .find_by_author(author)
            .map_err(Self::storage_err)?;
        Ok(all
            .into_iter()
            .filter(|t| testimony_access(RuleOp::Read, requester, Some(t), None).is_allow())
            .collect())
    }

    /// Shared rule-checked update path: mutate a copy, bump the version,
    /// evaluate, commit, emit.
    fn transition<F>(
        &self,
        requester: Option<&Identity>,
        id: &TestimonyId,
        mutate: F,
    ) -> RostraResult<Testimony>
    where
        F: FnOnce(&mut Testimony) -> Result<(), ValidationError>,
    {
        let existing = self.testimonies.get(id).map_err(Self::storage_err)?;

        let proposed = match existing.as_ref() {
            Some(e) => {
                let mut p = e.clone();
                mutate(&mut p)?;
                p.version += 1;
                Some(p)
            }
            None => None,
        };

        testimony_access(RuleOp::Update, requester, existing.as_ref(), proposed.as_ref())
            .into_result()
            .map_err(|r| Self::deny(TESTIMONY, id.as_str(), r))?;

        let updated = proposed.ok_or_else(|| RostraError::not_found(TESTIMONY, id.as_str()))?;
        self.testimonies
            .put(updated.clone())
            .map_err(Self::storage_err)?;
        self.emit(TestimonyChange::updated(updated.clone()));
        Ok(updated)
    }
}
