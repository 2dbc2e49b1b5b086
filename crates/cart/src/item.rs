use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstore_core::{BookId, CartItemId, Entity};

use crate::book::BookSnapshot;
use crate::quantity::Quantity;

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub cart_item_id: CartItemId,
    pub book: BookSnapshot,
    pub quantity: Quantity,
}

impl CartItem {
    pub fn new(cart_item_id: CartItemId, book: BookSnapshot, quantity: Quantity) -> Self {
        Self {
            cart_item_id,
            book,
            quantity,
        }
    }

    pub fn book_id(&self) -> BookId {
        self.book.book_id
    }

    /// `unit price × quantity`, unrounded.
    pub fn line_total(&self) -> Decimal {
        self.book.price.times(self.quantity.get())
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.cart_item_id
    }
}
