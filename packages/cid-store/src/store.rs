//! The content store contract.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{Cid, StoreError};

/// A stored hash-mode object.
///
/// Immutable once written. Embedded CIDs never produce a stored object
/// because their content lives in the identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub cid: Cid,
    pub content: Bytes,
    pub created_at: DateTime<Utc>,
}

/// Content-addressed storage.
///
/// The embedding/hash split is decided by [`Cid`] alone, so every
/// implementation applies the same boundary:
///
/// * `put` of at most [`EMBED_LIMIT`](crate::EMBED_LIMIT) bytes returns an
///   embedded CID and writes nothing. Larger content is stored once under its
///   digest; repeated puts of the same bytes are no-ops.
/// * `get` and `exists` on embedded CIDs never consult storage.
///
/// Methods take `&self`: a single store is shared by every concurrent
/// resolution, so implementations handle their own synchronization.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn ContentStore>`.
pub trait ContentStore: Send + Sync {
    /// Store content and return its CID.
    fn put(&self, content: &[u8]) -> Result<Cid, StoreError>;

    /// Fetch the content for a CID.
    ///
    /// Fails with [`StoreError::NotFound`] for unknown hash-mode CIDs.
    fn get(&self, cid: &Cid) -> Result<Bytes, StoreError>;

    /// Check whether content for a CID is available.
    fn exists(&self, cid: &Cid) -> Result<bool, StoreError>;

    /// Fetch the stored record for a hash-mode CID.
    fn record(&self, cid: &Cid) -> Result<Option<StoredObject>, StoreError>;

    /// Number of stored (hash-mode) records.
    fn len(&self) -> usize;

    /// Whether nothing has been stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Blanket implementations for references and smart pointers

impl<T: ContentStore + ?Sized> ContentStore for &T {
    fn put(&self, content: &[u8]) -> Result<Cid, StoreError> {
        (**self).put(content)
    }

    fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        (**self).get(cid)
    }

    fn exists(&self, cid: &Cid) -> Result<bool, StoreError> {
        (**self).exists(cid)
    }

    fn record(&self, cid: &Cid) -> Result<Option<StoredObject>, StoreError> {
        (**self).record(cid)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

impl<T: ContentStore + ?Sized> ContentStore for Box<T> {
    fn put(&self, content: &[u8]) -> Result<Cid, StoreError> {
        self.as_ref().put(content)
    }

    fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        self.as_ref().get(cid)
    }

    fn exists(&self, cid: &Cid) -> Result<bool, StoreError> {
        self.as_ref().exists(cid)
    }

    fn record(&self, cid: &Cid) -> Result<Option<StoredObject>, StoreError> {
        self.as_ref().record(cid)
    }

    fn len(&self) -> usize {
        self.as_ref().len()
    }
}

impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    fn put(&self, content: &[u8]) -> Result<Cid, StoreError> {
        self.as_ref().put(content)
    }

    fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        self.as_ref().get(cid)
    }

    fn exists(&self, cid: &Cid) -> Result<bool, StoreError> {
        self.as_ref().exists(cid)
    }

    fn record(&self, cid: &Cid) -> Result<Option<StoredObject>, StoreError> {
        self.as_ref().record(cid)
    }

    fn len(&self) -> usize {
        self.as_ref().len()
    }
}
