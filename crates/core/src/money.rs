//! Unit prices and money formatting.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Unit price of a book in the store currency.
///
/// Encoded as a JSON number on the wire (the backend serializes its decimal
/// prices as numbers), held as an exact decimal in memory so cart totals never
/// accumulate binary floating point error.
///
/// Decoding goes through [`Price::new`], so a stored or received price is
/// never negative and never above [`Price::MAX`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

impl ValueObject for Price {}

impl Price {
    /// Largest accepted unit price. Keeps `price × quantity` and cart totals
    /// far away from the decimal range.
    pub const MAX: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

    /// Create a price, rejecting negative amounts and amounts above
    /// [`Price::MAX`].
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "price must not be negative (got {amount})"
            )));
        }
        if amount > Self::MAX {
            return Err(DomainError::validation(format!(
                "price exceeds {} (got {amount})",
                Self::MAX
            )));
        }
        Ok(Self(amount))
    }

    /// Price from an amount in minor units (cents).
    pub fn from_minor_units(cents: i64) -> DomainResult<Self> {
        Self::new(Decimal::new(cents, 2))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Exact `price × quantity`, saturating at the decimal range.
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0.saturating_mul(Decimal::from(quantity))
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&format_amount(self.0))
    }
}

/// Render an amount with exactly two decimals, rounding half away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}
