//! Strongly-typed identifiers used across the domain.
//!
//! Users, books and carts are identified by the backend's integer keys. Cart
//! lines are the exception: a guest cart never talks to the backend, so its
//! lines carry client-generated UUIDs until they are merged server-side.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a user (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a catalog book (the product identifier).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(i64);

/// Identifier of a server-side cart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(i64);

macro_rules! impl_i64_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(raw))
            }
        }
    };
}

impl_i64_newtype!(UserId, "UserId");
impl_i64_newtype!(BookId, "BookId");
impl_i64_newtype!(CartId, "CartId");

/// Identifier of a line within one cart.
///
/// Serialized untagged: server ids are JSON numbers, local ids are UUID
/// strings, which is exactly how both shapes appear in persisted guest carts
/// and backend responses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CartItemId {
    /// Assigned by the backend cart service.
    Server(i64),
    /// Generated on the client for a guest cart line.
    Local(Uuid),
}

impl CartItemId {
    /// Generate a fresh client-side id (UUIDv7, time-ordered).
    pub fn generate() -> Self {
        Self::Local(Uuid::now_v7())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// The backend id, if this line is server-backed.
    pub fn server_id(&self) -> Option<i64> {
        match self {
            Self::Server(id) => Some(*id),
            Self::Local(_) => None,
        }
    }
}

impl core::fmt::Display for CartItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Server(id) => core::fmt::Display::fmt(id, f),
            Self::Local(uuid) => core::fmt::Display::fmt(uuid, f),
        }
    }
}

impl FromStr for CartItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Ok(Self::Server(id));
        }
        Uuid::from_str(s)
            .map(Self::Local)
            .map_err(|e| DomainError::invalid_id(format!("CartItemId: {e}")))
    }
}
