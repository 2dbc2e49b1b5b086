//! Wire types for the backend cart endpoints.
//!
//! The backend wraps every answer in a generic response envelope and omits
//! null fields, so "field absent" is a normal case here. Each absence is
//! decoded into an explicit variant instead of being defaulted away.

use serde::{Deserialize, Serialize};

use bookstore_cart::{BookSnapshot, CartItem, CartLines, Quantity};
use bookstore_core::{CartId, CartItemId};

use super::RemoteError;

/// Generic backend response envelope (only the cart-related fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<CartId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_item_list: Option<Vec<CartItemDto>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub cart_item_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<BookSnapshot>,
    pub quantity: i64,
}

/// What an envelope says about the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartPayload {
    /// The envelope carried no cart at all.
    Missing,
    /// A cart whose line list was omitted (the backend omits empty lists
    /// when the cart has never held items).
    WithoutItemList { cart_id: Option<CartId> },
    /// A cart with its lines.
    Lines { cart_id: Option<CartId>, lines: CartLines },
}

impl CartEnvelope {
    /// Decode the cart part of the envelope.
    pub fn into_payload(self) -> Result<CartPayload, RemoteError> {
        let Some(cart) = self.cart else {
            return Ok(CartPayload::Missing);
        };

        match cart.cart_item_list {
            None => Ok(CartPayload::WithoutItemList {
                cart_id: cart.cart_id,
            }),
            Some(list) => {
                let items = list
                    .into_iter()
                    .map(CartItemDto::into_item)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CartPayload::Lines {
                    cart_id: cart.cart_id,
                    lines: CartLines::from_items(items),
                })
            }
        }
    }

    /// Decode into the line list of a cart that must be present.
    pub fn into_lines(self) -> Result<CartLines, RemoteError> {
        match self.into_payload()? {
            CartPayload::Missing => Err(RemoteError::MissingCart),
            CartPayload::WithoutItemList { cart_id } => {
                tracing::debug!(?cart_id, "cart has no item list; treating as empty");
                Ok(CartLines::new())
            }
            CartPayload::Lines { lines, .. } => Ok(lines),
        }
    }
}

impl CartItemDto {
    fn into_item(self) -> Result<CartItem, RemoteError> {
        let book = self.book.ok_or_else(|| {
            RemoteError::Parse(format!("cart item {} has no book", self.cart_item_id))
        })?;
        let quantity = Quantity::try_from(self.quantity).map_err(|e| {
            RemoteError::Parse(format!("cart item {}: {e}", self.cart_item_id))
        })?;
        Ok(CartItem::new(
            CartItemId::Server(self.cart_item_id),
            book,
            quantity,
        ))
    }
}
