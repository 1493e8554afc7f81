//! Type-safe price representation using decimal arithmetic.
//!
//! The bakery sells in Brazilian reais only, so a [`Price`] carries no
//! currency code. Prices arrive from the API as JSON numbers (sometimes as
//! numeric strings, when a product was created from a raw form field) and from
//! the product form as text typed by a person, with either `.` or `,` as the
//! decimal separator.
//!
//! Form input is validated strictly by [`Price::parse`]. What the API returns
//! was never validated by anyone, so it is read into a [`ListedPrice`] that
//! keeps unparseable values as text.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, de};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The input is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A price in Brazilian reais.
///
/// Serialized as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in centavos.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Parse a price typed into a form.
    ///
    /// Accepts `12.5`, `12,50` and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, or negative.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let normalized = trimmed.replace(',', ".");
        let amount = Decimal::from_str(&normalized).map_err(|_| PriceError::NotANumber)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        Ok(Self(amount))
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity, e.g. for a cart line total.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn checked_times(&self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Returns `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Format for display, e.g. `R$ 12,50`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.0.round_dp(2);
        format!("R$ {rounded:.2}").replace('.', ",")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Wire representation accepted for prices.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(serde_json::Number),
    Text(String),
    Missing(()),
}

impl RawPrice {
    fn into_text(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
            Self::Missing(()) => String::new(),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = RawPrice::deserialize(deserializer)?.into_text();
        Self::parse(&text).map_err(de::Error::custom)
    }
}

/// A price as stored by the API.
///
/// Products registered through older clients may carry an empty, negative
/// or non-numeric price. Those are kept verbatim and shown as-is; they take
/// no part in totals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListedPrice {
    Valid(Price),
    Raw(String),
}

impl ListedPrice {
    /// The parsed price, if the stored value is a valid one.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        match self {
            Self::Valid(price) => Some(*price),
            Self::Raw(_) => None,
        }
    }

    /// Formatted price, or the stored text unchanged.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Valid(price) => price.display(),
            Self::Raw(text) => text.clone(),
        }
    }
}

impl Default for ListedPrice {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl From<Price> for ListedPrice {
    fn from(price: Price) -> Self {
        Self::Valid(price)
    }
}

impl fmt::Display for ListedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Serialize for ListedPrice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Valid(price) => price.serialize(serializer),
            Self::Raw(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for ListedPrice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Arrays and objects are still an error: that is not a price at all
        let text = RawPrice::deserialize(deserializer)?.into_text();
        Ok(Price::parse(&text).map_or(Self::Raw(text), Self::Valid))
    }
}
