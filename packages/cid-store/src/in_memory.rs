//! In-memory content store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use bytes::Bytes;
use chrono::Utc;

use crate::{Cid, ContentStore, StoreError, StoredObject};

/// A content store that keeps hash-mode objects in a map.
///
/// Writes take the write lock for the whole check-then-insert, so two
/// concurrent puts of the same content still produce a single record.
///
/// # Example
///
/// ```rust
/// use cidchain_store::{ContentStore, InMemoryContentStore};
///
/// let store = InMemoryContentStore::new();
/// let big = vec![b'x'; 200];
///
/// let first = store.put(&big).unwrap();
/// let second = store.put(&big).unwrap();
/// assert_eq!(first, second);
/// assert_eq!(store.len(), 1);
/// ```
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<Cid, StoredObject>>,
    lookups: AtomicUsize,
}

impl InMemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of times a hash-mode CID was looked up in the map.
    ///
    /// Embedded CIDs never increment this counter.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    fn lookup(&self, cid: &Cid) -> Result<Option<StoredObject>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read().map_err(|_| StoreError::Backend {
            message: "content store lock poisoned".to_string(),
        })?;
        Ok(objects.get(cid).cloned())
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, content: &[u8]) -> Result<Cid, StoreError> {
        let cid = Cid::for_content(content);
        if cid.is_embedded() {
            return Ok(cid);
        }

        let mut objects = self.objects.write().map_err(|_| StoreError::Backend {
            message: "content store lock poisoned".to_string(),
        })?;

        match objects.entry(cid.clone()) {
            Entry::Occupied(_) => {
                tracing::trace!(cid = %cid, "content already stored");
            }
            Entry::Vacant(slot) => {
                tracing::debug!(cid = %cid, bytes = content.len(), "storing content");
                slot.insert(StoredObject {
                    cid: cid.clone(),
                    content: Bytes::copy_from_slice(content),
                    created_at: Utc::now(),
                });
            }
        }

        Ok(cid)
    }

    fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        if let Some(content) = cid.embedded_content() {
            return Ok(Bytes::from(content));
        }

        self.lookup(cid)?
            .map(|object| object.content)
            .ok_or_else(|| StoreError::NotFound { cid: cid.clone() })
    }

    fn exists(&self, cid: &Cid) -> Result<bool, StoreError> {
        if cid.is_embedded() {
            return Ok(true);
        }
        Ok(self.lookup(cid)?.is_some())
    }

    fn record(&self, cid: &Cid) -> Result<Option<StoredObject>, StoreError> {
        if cid.is_embedded() {
            return Ok(None);
        }
        self.lookup(cid)
    }

    fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }
}
