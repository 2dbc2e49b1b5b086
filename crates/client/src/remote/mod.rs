//! Remote Cart Service contract.
//!
//! The backend owns authenticated carts. Every mutating call returns the
//! cart's full, authoritative line list, which callers adopt wholesale.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use bookstore_cart::{CartLines, Quantity};
use bookstore_core::{BookId, CartItemId};

use crate::session::Identity;

mod dto;
mod http;
mod memory;

pub use dto::{CartDto, CartEnvelope, CartItemDto, CartPayload};
pub use http::HttpCartService;
pub use memory::{InMemoryCartService, RecordedCall};

/// Remote cart operation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never produced a response (connect, DNS, reset...).
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured limit.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body did not match the cart schema.
    #[error("parse error: {0}")]
    Parse(String),

    /// A success response that carried no cart.
    #[error("response did not include a cart")]
    MissingCart,

    /// A client-generated line id was sent to the backend.
    #[error("cart item {0} has no server id")]
    LocalItemId(CartItemId),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Backend cart operations, scoped to the calling user.
///
/// Implementations attach the identity's credential to every call.
#[async_trait]
pub trait CartService: Send + Sync {
    /// The user's cart, or `None` if the user has none yet.
    async fn fetch_cart(&self, identity: &Identity) -> Result<Option<CartLines>, RemoteError>;

    /// Create an empty cart for the user.
    async fn create_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError>;

    /// Add `quantity` copies of a book (the backend merges same-book lines).
    async fn add_item(
        &self,
        identity: &Identity,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError>;

    /// Set the quantity of one line.
    async fn update_item_quantity(
        &self,
        identity: &Identity,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError>;

    async fn remove_item(
        &self,
        identity: &Identity,
        item_id: CartItemId,
    ) -> Result<CartLines, RemoteError>;

    async fn clear_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError>;
}

#[async_trait]
impl<S> CartService for Arc<S>
where
    S: CartService + ?Sized,
{
    async fn fetch_cart(&self, identity: &Identity) -> Result<Option<CartLines>, RemoteError> {
        (**self).fetch_cart(identity).await
    }

    async fn create_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError> {
        (**self).create_cart(identity).await
    }

    async fn add_item(
        &self,
        identity: &Identity,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError> {
        (**self).add_item(identity, book_id, quantity).await
    }

    async fn update_item_quantity(
        &self,
        identity: &Identity,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError> {
        (**self).update_item_quantity(identity, item_id, quantity).await
    }

    async fn remove_item(
        &self,
        identity: &Identity,
        item_id: CartItemId,
    ) -> Result<CartLines, RemoteError> {
        (**self).remove_item(identity, item_id).await
    }

    async fn clear_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError> {
        (**self).clear_cart(identity).await
    }
}

/// Bound a remote call by `limit`.
///
/// Dropping the returned future cancels the call.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}
