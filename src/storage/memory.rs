//! In-memory storage backend.
//!
//! Thread-safe in-memory implementations of the storage traits, intended
//! for embedded usage, tests, and as a reference implementation. Each
//! method takes the collection lock for the duration of the operation, so
//! writes to a key are serialized and commit atomically.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::identity::UserId;
use crate::profile::Profile;
use crate::storage::traits::{ProfileStore, StorageError, TestimonyStore};
use crate::testimony::{Testimony, TestimonyId};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: RwLock<HashMap<UserId, Profile>>,
}

impl InMemoryProfileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    ///
    /// # Errors
    /// `BackendError` if the collection lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.rows.read().map_err(|_| lock_err("profiles"))?.len())
    }

    /// Returns true if no profiles are stored.
    ///
    /// # Errors
    /// `BackendError` if the collection lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn insert(&self, uid: &UserId, profile: Profile) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("profiles"))?;
        if rows.contains_key(uid) {
            return Err(StorageError::DuplicateKey(uid.to_string()));
        }
        rows.insert(uid.clone(), profile);
        Ok(())
    }

    fn get(&self, uid: &UserId) -> Result<Option<Profile>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("profiles"))?;
        Ok(rows.get(uid).cloned())
    }

    fn put(&self, uid: &UserId, profile: Profile) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("profiles"))?;
        if !rows.contains_key(uid) {
            return Err(StorageError::ProfileNotFound(uid.clone()));
        }
        rows.insert(uid.clone(), profile);
        Ok(())
    }

    fn remove(&self, uid: &UserId) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("profiles"))?;
        if rows.remove(uid).is_none() {
            return Err(StorageError::ProfileNotFound(uid.clone()));
        }
        Ok(())
    }
}

/// In-memory testimony store.
#[derive(Debug, Default)]
pub struct InMemoryTestimonyStore {
    rows: RwLock<HashMap<TestimonyId, Testimony>>,
}

impl InMemoryTestimonyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored testimony documents.
    ///
    /// # Errors
    /// `BackendError` if the collection lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.rows.read().map_err(|_| lock_err("testimony"))?.len())
    }

    /// Returns true if no testimony is stored.
    ///
    /// # Errors
    /// `BackendError` if the collection lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl TestimonyStore for InMemoryTestimonyStore {
    fn insert(&self, testimony: Testimony) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("testimony"))?;
        if rows.contains_key(&testimony.id) {
            return Err(StorageError::DuplicateKey(testimony.id.to_string()));
        }
        rows.insert(testimony.id.clone(), testimony);
        Ok(())
    }

    fn get(&self, id: &TestimonyId) -> Result<Option<Testimony>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("testimony"))?;
        Ok(rows.get(id).cloned())
    }

    fn put(&self, testimony: Testimony) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("testimony"))?;
        if !rows.contains_key(&testimony.id) {
            return Err(StorageError::TestimonyNotFound(testimony.id.clone()));
        }
        rows.insert(testimony.id.clone(), testimony);
        Ok(())
    }

    fn remove(&self, id: &TestimonyId) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("testimony"))?;
        if rows.remove(id).is_none() {
            return Err(StorageError::TestimonyNotFound(id.clone()));
        }
        Ok(())
    }

    fn find_by_author(&self, author: &UserId) -> Result<Vec<Testimony>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("testimony"))?;
        let mut out: Vec<Testimony> = rows
            .values()
            .filter(|t| t.author == *author)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.bill_id.as_str().cmp(b.bill_id.as_str()));
        Ok(out)
    }
}

/// Bundle of in-memory stores for embedded use and tests.
#[derive(Debug, Default)]
pub struct InMemoryStores {
    /// Profile collection.
    pub profiles: InMemoryProfileStore,
    /// Testimony collection.
    pub testimonies: InMemoryTestimonyStore,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testimony::{BillId, Court};

    fn sample_testimony(author: &str, bill: &str) -> Testimony {
        Testimony::draft(
            UserId::new(author),
            BillId::from(bill),
            Court::new(193),
            serde_json::json!({ "text": "body" }),
        )
        .unwrap()
    }

    #[test]
    fn test_profile_insert_get_roundtrip() {
        let store = InMemoryProfileStore::new();
        let uid = UserId::new("u1");

        assert!(store.get(&uid).unwrap().is_none());

        store
            .insert(&uid, Profile::new().with_full_name("Ada"))
            .unwrap();
        let profile = store.get(&uid).unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Ada"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_profile_duplicate_insert_rejected() {
        let store = InMemoryProfileStore::new();
        let uid = UserId::new("u1");

        store.insert(&uid, Profile::new()).unwrap();
        let err = store.insert(&uid, Profile::new()).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
    }

    #[test]
    fn test_profile_put_requires_existing_row() {
        let store = InMemoryProfileStore::new();
        let uid = UserId::new("u1");

        let err = store.put(&uid, Profile::new()).unwrap_err();
        assert!(matches!(err, StorageError::ProfileNotFound(_)));

        store.insert(&uid, Profile::new()).unwrap();
        store.put(&uid, Profile::new().with_public(true)).unwrap();
        assert!(store.get(&uid).unwrap().unwrap().public);
    }

    #[test]
    fn test_profile_remove() {
        let store = InMemoryProfileStore::new();
        let uid = UserId::new("u1");

        assert!(store.remove(&uid).is_err());

        store.insert(&uid, Profile::new()).unwrap();
        store.remove(&uid).unwrap();
        assert!(store.get(&uid).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_testimony_insert_and_duplicate() {
        let store = InMemoryTestimonyStore::new();
        let t = sample_testimony("u1", "H.1");

        store.insert(t.clone()).unwrap();
        let err = store.insert(t).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
    }

    #[test]
    fn test_testimony_put_replaces_row() {
        let store = InMemoryTestimonyStore::new();
        let mut t = sample_testimony("u1", "H.1");
        store.insert(t.clone()).unwrap();

        t.publish(chrono::Utc::now());
        t.version += 1;
        store.put(t.clone()).unwrap();

        let stored = store.get(&t.id).unwrap().unwrap();
        assert!(stored.is_published());
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_find_by_author_sorted_by_bill() {
        let store = InMemoryTestimonyStore::new();
        store.insert(sample_testimony("u1", "S.20")).unwrap();
        store.insert(sample_testimony("u1", "H.1")).unwrap();
        store.insert(sample_testimony("u2", "H.1")).unwrap();

        let mine = store.find_by_author(&UserId::new("u1")).unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].bill_id.as_str(), "H.1");
        assert_eq!(mine[1].bill_id.as_str(), "S.20");
    }
}
