//! Content-addressed storage for cidchain.
//!
//! Every piece of content is named by a [`Cid`] derived from its bytes:
//! - Content of at most [`EMBED_LIMIT`] bytes is embedded in the identifier
//!   itself and can be recovered without touching a store.
//! - Larger content is named by its SHA-512 digest and must be looked up.
//!
//! The [`ContentStore`] trait is the external contract. Writes are
//! idempotent (identical bytes always produce the same CID and one stored
//! record) and append-only.
//!
//! # Example
//!
//! ```rust
//! use cidchain_store::{ContentStore, InMemoryContentStore};
//!
//! let store = InMemoryContentStore::new();
//! let cid = store.put(b"hello").unwrap();
//! assert!(cid.is_embedded());
//! assert_eq!(&store.get(&cid).unwrap()[..], b"hello");
//! ```

pub use bytes::Bytes;

mod cid;
mod error;
mod format;
mod in_memory;
mod store;

pub use cid::{Cid, CidError, EMBED_LIMIT};
pub use error::StoreError;
pub use format::Format;
pub use in_memory::InMemoryContentStore;
pub use store::{ContentStore, StoredObject};
