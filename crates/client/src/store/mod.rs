//! String-keyed local persistence.
//!
//! The cart keeps everything it must remember across restarts (the guest
//! cart, the session record, the reload flag and the merge markers) as JSON
//! strings under fixed keys in a [`KeyValueStore`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Keys used by the client in the local store.
pub mod keys {
    /// Serialized guest cart (JSON array of cart items).
    pub const GUEST_CART: &str = "cart";
    /// Serialized session record (`{ "userId": .., "authToken": .. }`).
    pub const SESSION: &str = "user";
    /// One-shot flag: the authenticated view must be refetched on next read.
    pub const FORCE_RELOAD: &str = "forceReloadCart";
    /// User id whose login merge has completed.
    pub const MERGED_FOR: &str = "cartMergedFor";
    /// Book ids already transferred by an incomplete merge.
    pub const MERGE_PROGRESS: &str = "cartMergeProgress";
}

/// Local store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A read or write against the backing store failed.
    #[error("local store operation failed: {0}")]
    Backend(String),

    /// A value could not be encoded for storage.
    #[error("failed to encode value for key {key}: {message}")]
    Encode { key: String, message: String },
}

/// Persisted, string-keyed key-value store.
///
/// Writes are immediate: once `set`/`remove` returns `Ok`, a subsequent `get`
/// (from this or a fresh handle on the same backing store) observes it.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }
}
