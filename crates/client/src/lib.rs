//! `bookstore-client`
//!
//! **Responsibility:** client-side cart lifecycle for the bookstore.
//!
//! This crate provides:
//! - Local key-value persistence (in-memory and SQLite) for the guest cart,
//!   the session record and the cart flags
//! - The remote Cart Service contract and its HTTP implementation
//! - `CartManager`: one cart view across guest and authenticated modes,
//!   including the one-time guest-to-user merge at login
//!
//! The backend remains the authority for authenticated carts; the client
//! never patches a server cart locally, it replaces its view with whatever
//! the backend returns.

pub mod config;
pub mod guest;
pub mod manager;
pub mod merge;
pub mod mode;
pub mod remote;
pub mod session;
pub mod store;

pub use config::ClientConfig;
pub use guest::{LocalCartStore, TransferredLine};
pub use manager::{CartError, CartManager};
pub use merge::{MergeFailure, MergeOutcome, MergeReport};
pub use mode::CartMode;
pub use remote::{CartService, HttpCartService, InMemoryCartService, RemoteError};
pub use session::{AuthToken, Identity, SessionStore};
pub use store::{InMemoryStore, KeyValueStore, SqliteStore, StoreError};
