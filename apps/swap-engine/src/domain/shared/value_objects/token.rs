//! Token value objects: mint addresses and base-unit amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::errors::DomainError;

/// Venue address of a token mint. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenMint(String);

impl TokenMint {
    /// Create a mint address, rejecting blank input.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidValue` if the address is empty.
    pub fn new(address: impl Into<String>) -> Result<Self, DomainError> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "token_mint".to_string(),
                message: "mint address cannot be empty".to_string(),
            });
        }
        Ok(Self(address))
    }

    /// Get the address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenMint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TokenMint {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TokenMint> for String {
    fn from(mint: TokenMint) -> Self {
        mint.0
    }
}

/// Non-negative token amount in base units (no decimal scaling).
///
/// Serialized as a decimal string so JSON consumers never lose precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create from raw base units.
    #[must_use]
    pub const fn new(base_units: u128) -> Self {
        Self(base_units)
    }

    /// Raw base units.
    #[must_use]
    pub const fn base_units(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a `0x`-prefixed hexadecimal amount (queue payload encoding).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidValue` on malformed or overflowing input.
    pub fn from_hex(s: &str) -> Result<Self, DomainError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u128::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| invalid_amount(s, &e.to_string()))
    }

    /// Encode as a `0x`-prefixed hexadecimal string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// Checked subtraction, `None` on underflow.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Render in display units for a token with `decimals` precision.
    ///
    /// Returns `None` when the amount exceeds what `Decimal` can represent.
    #[must_use]
    pub fn to_decimal_units(&self, decimals: u8) -> Option<Decimal> {
        let raw = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(raw, u32::from(decimals)).ok()
    }
}

fn invalid_amount(input: &str, reason: &str) -> DomainError {
    DomainError::InvalidValue {
        field: "amount".to_string(),
        message: format!("'{input}' is not a valid token amount: {reason}"),
    }
}

impl FromStr for TokenAmount {
    type Err = DomainError;

    /// Accepts decimal strings, or hex when prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            return Self::from_hex(s);
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|e| invalid_amount(s, &e.to_string()))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
