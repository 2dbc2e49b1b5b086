//! Guest cart persistence and the cart's durable flags.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use bookstore_cart::{BookSnapshot, CartItem, CartLines, Quantity};
use bookstore_core::{BookId, CartItemId, UserId};

use crate::store::{keys, KeyValueStore, StoreError};

/// A guest cart line as found in the store.
///
/// Older storefront builds wrote lines without an id, and random integers
/// rather than UUIDs as ids, so both the id and its shape are optional here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCartItem {
    #[serde(default)]
    cart_item_id: Option<Value>,
    book: BookSnapshot,
    quantity: i64,
}

/// Copies of one book already added to a user's server cart by an
/// incomplete merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferredLine {
    pub book_id: BookId,
    pub quantity: u32,
}

/// Progress of an incomplete merge for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeProgressRecord {
    user_id: UserId,
    transferred: Vec<TransferredLine>,
}

/// Local side of the cart: the guest cart plus the reload flag and merge
/// markers, all in one [`KeyValueStore`].
///
/// Every write is a full re-serialization of the value; there is no buffering.
#[derive(Debug, Clone)]
pub struct LocalCartStore<S> {
    store: S,
}

impl<S: KeyValueStore> LocalCartStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the guest cart.
    ///
    /// Malformed data is an empty cart, never an error. Lines without a
    /// usable id get a generated one, lines with an out-of-range quantity or
    /// price are dropped, and duplicate books are folded together; when any
    /// of that happens the repaired cart is written back.
    pub async fn load(&self) -> Result<CartLines, StoreError> {
        let Some(raw) = self.store.get(keys::GUEST_CART).await? else {
            return Ok(CartLines::new());
        };

        let entries: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("guest cart is not valid JSON, treating as empty: {err}");
                return Ok(CartLines::new());
            }
        };

        let total_entries = entries.len();
        let mut repaired = false;
        let mut seen_ids = std::collections::HashSet::new();
        let mut items = Vec::with_capacity(total_entries);

        for entry in entries {
            let stored: StoredCartItem = match serde_json::from_value(entry) {
                Ok(stored) => stored,
                Err(err) => {
                    tracing::warn!("dropping unreadable guest cart line: {err}");
                    repaired = true;
                    continue;
                }
            };

            let Ok(quantity) = Quantity::try_from(stored.quantity) else {
                tracing::warn!(
                    book_id = %stored.book.book_id,
                    quantity = stored.quantity,
                    "dropping guest cart line with out-of-range quantity"
                );
                repaired = true;
                continue;
            };

            let parsed_id = stored
                .cart_item_id
                .and_then(|v| serde_json::from_value::<CartItemId>(v).ok());
            let id = match parsed_id {
                Some(id) if !seen_ids.contains(&id) => id,
                _ => {
                    repaired = true;
                    CartItemId::generate()
                }
            };
            seen_ids.insert(id);

            items.push(CartItem::new(id, stored.book, quantity));
        }

        let lines = CartLines::from_items(items);
        if lines.len() != total_entries {
            repaired = true;
        }
        if repaired {
            tracing::debug!(lines = lines.len(), "writing back repaired guest cart");
            self.save(&lines).await?;
        }
        Ok(lines)
    }

    /// Replace the stored guest cart with `lines`.
    pub async fn save(&self, lines: &CartLines) -> Result<(), StoreError> {
        let raw = encode(keys::GUEST_CART, lines)?;
        self.store.set(keys::GUEST_CART, &raw).await
    }

    /// Forget the guest cart.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(keys::GUEST_CART).await
    }

    pub async fn mark_reload_needed(&self) -> Result<(), StoreError> {
        self.store.set(keys::FORCE_RELOAD, "1").await
    }

    pub async fn reload_needed(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(keys::FORCE_RELOAD).await?.as_deref() == Some("1"))
    }

    pub async fn clear_reload_flag(&self) -> Result<(), StoreError> {
        self.store.remove(keys::FORCE_RELOAD).await
    }

    /// User whose login merge has completed, if any.
    pub async fn merged_for(&self) -> Result<Option<UserId>, StoreError> {
        Ok(self
            .store
            .get(keys::MERGED_FOR)
            .await?
            .and_then(|raw| raw.parse::<UserId>().ok()))
    }

    pub async fn mark_merged_for(&self, user_id: UserId) -> Result<(), StoreError> {
        self.store.set(keys::MERGED_FOR, &user_id.to_string()).await
    }

    pub async fn clear_merged_marker(&self) -> Result<(), StoreError> {
        self.store.remove(keys::MERGED_FOR).await
    }

    /// What an incomplete merge already transferred to `user_id`.
    ///
    /// A record belonging to another user is ignored. The record survives
    /// logout: the guest cart it refers to is kept too.
    pub async fn merge_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<TransferredLine>, StoreError> {
        let Some(raw) = self.store.get(keys::MERGE_PROGRESS).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<MergeProgressRecord>(&raw) {
            Ok(record) if record.user_id == user_id => Ok(record.transferred),
            Ok(_) => Ok(Vec::new()),
            Err(err) => {
                tracing::warn!("ignoring malformed merge progress record: {err}");
                Ok(Vec::new())
            }
        }
    }

    pub async fn record_merge_progress(
        &self,
        user_id: UserId,
        transferred: &[TransferredLine],
    ) -> Result<(), StoreError> {
        let record = MergeProgressRecord {
            user_id,
            transferred: transferred.to_vec(),
        };
        let raw = encode(keys::MERGE_PROGRESS, &record)?;
        self.store.set(keys::MERGE_PROGRESS, &raw).await
    }

    pub async fn clear_merge_progress(&self) -> Result<(), StoreError> {
        self.store.remove(keys::MERGE_PROGRESS).await
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Encode {
        key: key.to_string(),
        message: e.to_string(),
    })
}
