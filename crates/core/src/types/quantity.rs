//! Cart line quantity.

use core::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input is not a whole number.
    #[error("quantity must be a whole number")]
    NotANumber,
    /// The input is zero or negative.
    #[error("quantity must be at least 1")]
    BelowMinimum,
}

/// A positive number of units of a product in a cart.
///
/// Zero is not a quantity: removing a line is a separate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit, used when adding a product from the catalog.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Parse a quantity typed into a form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an integer or is below 1.
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let value: i64 = s.trim().parse().map_err(|_| QuantityError::NotANumber)?;
        if value < 1 {
            return Err(QuantityError::BelowMinimum);
        }
        let value = u32::try_from(value).map_err(|_| QuantityError::NotANumber)?;
        Self::new(value).ok_or(QuantityError::BelowMinimum)
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
