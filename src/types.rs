//! Core types used throughout the oracle
//!
//! Defines the asset key used to look up price sources.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::OracleError;

/// Uppercase asset key (e.g. `BTC`, `QQQ`) used to look up registry entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetSymbol(String);

impl AssetSymbol {
    /// Normalize user input: trims whitespace and uppercases.
    ///
    /// Rejects empty keys and anything that is not ASCII alphanumeric, so a
    /// symbol can always be embedded in a provider URL without escaping.
    pub fn parse(raw: &str) -> Result<Self, OracleError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(OracleError::UnsupportedSymbol(raw.trim().to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AssetSymbol {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Asset class of a registered symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetClass {
    /// Served by live public price APIs.
    Crypto,
    /// Index / equity proxy with no live API; only the static fallback table can answer it.
    EquityProxy,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Crypto => write!(f, "crypto"),
            AssetClass::EquityProxy => write!(f, "equity-proxy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uppercases_and_trims() {
        let symbol = AssetSymbol::parse("  btc ").unwrap();
        assert_eq!(symbol.as_str(), "BTC");
        assert_eq!(symbol.to_string(), "BTC");
    }

    #[test]
    fn parse_rejects_empty_and_non_alphanumeric() {
        assert!(matches!(
            AssetSymbol::parse("   "),
            Err(OracleError::UnsupportedSymbol(_))
        ));
        assert!(AssetSymbol::parse("BTC/USD").is_err());
        assert!(AssetSymbol::parse("../etc").is_err());
    }
}
