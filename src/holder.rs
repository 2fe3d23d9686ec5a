//! Identity value objects: account numbers and account holders.

use crate::error::{LedgerError, Result};
use serde::Serialize;
use std::fmt;

/// Account number. Always a positive integer; immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountId(u32);

impl AccountId {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for AccountId {
    type Error = LedgerError;

    fn try_from(raw: i64) -> Result<Self> {
        match u32::try_from(raw) {
            Ok(value) if value > 0 => Ok(AccountId(value)),
            _ => Err(LedgerError::InvalidAccountId(raw)),
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Holder tax identifier in the `NNN.NNN.NNN-NN` layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaxId(String);

impl TaxId {
    const LAYOUT: &'static [u8] = b"ddd.ddd.ddd-dd";

    /// Parses a tax id, accepting surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let bytes = trimmed.as_bytes();
        let valid = bytes.len() == Self::LAYOUT.len()
            && bytes
                .iter()
                .zip(Self::LAYOUT)
                .all(|(&b, &expected)| match expected {
                    b'd' => b.is_ascii_digit(),
                    sep => b == sep,
                });

        if !valid {
            return Err(LedgerError::InvalidHolder(format!(
                "tax id {:?} must match NNN.NNN.NNN-NN",
                trimmed
            )));
        }
        Ok(TaxId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The person who owns an account.
///
/// Owned exclusively by its [`Account`](crate::Account); replaced wholesale on
/// rename, never shared between accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holder {
    name: String,
    tax_id: TaxId,
}

impl Holder {
    pub const MIN_NAME_LEN: usize = 2;
    pub const MAX_NAME_LEN: usize = 100;

    /// Validates and builds a holder. The name is trimmed first.
    pub fn new(name: &str, tax_id: TaxId) -> Result<Self> {
        let name = name.trim();
        let len = name.chars().count();
        if !(Self::MIN_NAME_LEN..=Self::MAX_NAME_LEN).contains(&len) {
            return Err(LedgerError::InvalidHolder(format!(
                "name must have between {} and {} characters, got {}",
                Self::MIN_NAME_LEN,
                Self::MAX_NAME_LEN,
                len
            )));
        }
        Ok(Holder {
            name: name.to_string(),
            tax_id,
        })
    }

    /// Parses both fields from raw strings.
    pub fn parse(name: &str, tax_id: &str) -> Result<Self> {
        Holder::new(name, TaxId::parse(tax_id)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tax_id(&self) -> &TaxId {
        &self.tax_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_rejects_non_positive() {
        assert_eq!(AccountId::try_from(1001).unwrap().get(), 1001);
        assert!(matches!(
            AccountId::try_from(0),
            Err(LedgerError::InvalidAccountId(0))
        ));
        assert!(matches!(
            AccountId::try_from(-5),
            Err(LedgerError::InvalidAccountId(-5))
        ));
        assert!(AccountId::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_tax_id_layout() {
        assert_eq!(
            TaxId::parse(" 111.111.111-11 ").unwrap().as_str(),
            "111.111.111-11"
        );
        assert!(TaxId::parse("11111111111").is_err());
        assert!(TaxId::parse("111.111.111.11").is_err());
        assert!(TaxId::parse("111.111.11a-11").is_err());
        assert!(TaxId::parse("111.111.111-111").is_err());
        assert!(TaxId::parse("").is_err());
    }

    #[test]
    fn test_holder_name_bounds() {
        assert_eq!(Holder::parse("  Ana ", "111.111.111-11").unwrap().name(), "Ana");
        assert!(Holder::parse("A", "111.111.111-11").is_err());
        assert!(Holder::parse("   ", "111.111.111-11").is_err());
        assert!(Holder::parse(&"x".repeat(100), "111.111.111-11").is_ok());
        assert!(Holder::parse(&"x".repeat(101), "111.111.111-11").is_err());
    }

    #[test]
    fn test_holder_name_counts_characters_not_bytes() {
        assert!(Holder::parse("Zé", "111.111.111-11").is_ok());
        assert!(Holder::parse(&"ã".repeat(100), "111.111.111-11").is_ok());
    }
}
