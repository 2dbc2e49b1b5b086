//! `bookstore-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the cart domain and
//! the client (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BookId, CartId, CartItemId, UserId};
pub use money::{format_amount, Price};
pub use value_object::ValueObject;
