//! `bookstore-cart`: shopping cart domain.
//!
//! Pure, IO-free model of a cart: the book snapshot embedded in each line, the
//! non-zero quantity type, cart lines and the ordered line collection with its
//! derived totals. Guest-mode mutations are implemented here directly; the
//! client crate decides where the lines live (local store or backend).

pub mod book;
pub mod item;
pub mod lines;
pub mod quantity;

pub use book::BookSnapshot;
pub use item::CartItem;
pub use lines::{CartLines, CartSummary};
pub use quantity::Quantity;
