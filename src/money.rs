//! Fixed-point money type with 2 decimal places.
//!
//! Uses `rust_decimal` internally with scale enforcement so repeated
//! deposits and withdrawals never drift the way binary floating point does.

use crate::error::ParseMoneyError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A monetary amount that always carries exactly 2 decimal places.
///
/// Parsing rejects amounts with more precision than a cent instead of
/// rounding them, so every stored balance is exactly what was requested.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use account_ledger::Money;
///
/// let amount = Money::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// assert!(Money::from_str("0.001").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Builds an amount from a whole number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, Self::SCALE))
    }

    /// Wraps a `Decimal`, failing if it has sub-cent precision or is too
    /// large to carry 2 decimal places.
    pub fn try_from_decimal(value: Decimal) -> Result<Self, ParseMoneyError> {
        if value.normalize().scale() > Self::SCALE {
            return Err(ParseMoneyError::TooPrecise(value.to_string()));
        }
        Self::rescaled(value).ok_or_else(|| ParseMoneyError::OutOfRange(value.to_string()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if the amount is strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Adds two amounts, returning `None` if the result cannot keep 2
    /// decimal places.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).and_then(Self::rescaled)
    }

    /// Subtracts `rhs`, returning `None` if the result cannot keep 2
    /// decimal places.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).and_then(Self::rescaled)
    }

    /// Sums amounts, returning `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }

    /// `rescale` leaves the scale lower when the mantissa would overflow.
    fn rescaled(mut value: Decimal) -> Option<Self> {
        value.rescale(Self::SCALE);
        (value.scale() == Self::SCALE).then_some(Money(value))
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseMoneyError::Empty);
        }
        let decimal = Decimal::from_str(trimmed).map_err(ParseMoneyError::Decimal)?;
        Money::try_from_decimal(decimal)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}
