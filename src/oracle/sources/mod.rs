//! Price source implementations (Binance, OKX, CoinPaprika, CoinGecko, CoinCap)
//!
//! Each source knows how to build its request URL and how to pull a price out
//! of its own JSON shape. Parsers are pure and total: malformed input yields
//! `None`, never a panic.

mod binance;
mod coincap;
mod coingecko;
mod coinpaprika;
mod okx;

pub use binance::{BinanceKlines, BinanceTicker};
pub use coincap::{CoinCapAsset, CoinCapHistory};
pub use coingecko::{CoinGeckoHistory, CoinGeckoSimple};
pub use coinpaprika::CoinPaprikaTicker;
pub use okx::OkxTicker;

use chrono::NaiveDate;
use serde_json::Value;

/// Live price source for one asset
pub trait PriceSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Request URL for the current price
    fn endpoint(&self) -> String;

    /// Extract the price; `None` when the payload carries no usable price
    fn parse(&self, body: &Value) -> Option<f64>;
}

/// A price recorded for one calendar day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Source able to answer "price of this asset on this day"
pub trait HistoricalSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Oldest date the provider has data for
    fn earliest_date(&self) -> NaiveDate;

    fn endpoint(&self, date: NaiveDate) -> String;

    /// Extract the dated price. The returned date is the one the provider
    /// reports, which callers compare against the requested day.
    fn parse(&self, body: &Value, requested: NaiveDate) -> Option<HistoricalPoint>;
}

/// Accept only finite, strictly positive prices.
pub(crate) fn positive_price(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Read a price that providers send either as a JSON number or a numeric string.
pub(crate) fn price_value(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    positive_price(raw)
}

/// Milliseconds since epoch at 00:00 UTC of `date`.
pub(crate) fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// UTC calendar day of an epoch-millis timestamp.
pub(crate) fn date_from_millis(ms: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}
