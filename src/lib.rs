//! Price Oracle Library
//!
//! Multi-source crypto price resolution with diagnostics, ordered fallback
//! and exact-day historical lookups.

pub mod config;
pub mod error;
pub mod oracle;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

pub use error::OracleError;
pub use oracle::{PriceOracle, PriceQuote, ProbeReport, QuoteRequest};
pub use types::{AssetClass, AssetSymbol};
