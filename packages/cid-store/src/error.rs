//! Error types for the content store.

use thiserror::Error;

use crate::cid::{Cid, CidError};

/// Errors returned by [`ContentStore`](crate::ContentStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A hash-mode CID has no stored content.
    #[error("content not found for cid {cid}")]
    NotFound { cid: Cid },

    /// A string could not be parsed as a CID.
    #[error("invalid cid: {0}")]
    InvalidCid(#[from] CidError),

    /// The backing store failed.
    #[error("store backend failure: {message}")]
    Backend { message: String },
}
