use serde::{Deserialize, Serialize};

use bookstore_core::{DomainError, DomainResult};

/// Number of copies on a cart line; always between one and [`Quantity::MAX`].
///
/// The upper bound is the backend's `int` range, so every quantity the
/// client holds can be sent as-is.
///
/// A line whose quantity would drop to zero is removed instead, so there is no
/// way to represent (or persist) a zero-quantity line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Self = Self(1);
    pub const MAX: Self = Self(i32::MAX as u32);

    pub fn new(value: u32) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if value > Self::MAX.0 {
            return Err(DomainError::validation(format!(
                "quantity must be at most {} (got {value})",
                Self::MAX.0
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// `self + other`, saturating at [`Quantity::MAX`].
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0).min(Self::MAX.0))
    }

    /// One more copy, saturating at [`Quantity::MAX`].
    pub fn incremented(self) -> Self {
        self.saturating_add(Self::ONE)
    }

    /// One copy fewer, or `None` when the line should disappear.
    pub fn decremented(self) -> Option<Self> {
        match self.0 {
            1 => None,
            n => Some(Self(n - 1)),
        }
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let value = u32::try_from(value)
            .map_err(|_| DomainError::validation(format!("quantity out of range: {value}")))?;
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_are_rejected() {
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::try_from(-3).is_err());
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
    }

    #[test]
    fn decrement_from_one_is_none() {
        assert_eq!(Quantity::ONE.decremented(), None);
        assert_eq!(Quantity::new(3).unwrap().decremented(), Some(Quantity::new(2).unwrap()));
    }

    #[test]
    fn arithmetic_saturates() {
        let max = Quantity::MAX;
        assert_eq!(max.incremented(), max);
        assert_eq!(max.saturating_add(Quantity::ONE), max);
        assert_eq!(max.saturating_add(max), max);
    }

    #[test]
    fn values_beyond_the_backend_int_range_are_rejected() {
        assert_eq!(Quantity::new(2_147_483_647).unwrap(), Quantity::MAX);
        assert!(Quantity::new(2_147_483_648).is_err());
        assert!(Quantity::new(u32::MAX).is_err());
        assert!(Quantity::try_from(i64::from(u32::MAX) + 1).is_err());
        assert!(serde_json::from_str::<Quantity>("3000000000").is_err());
    }
}
