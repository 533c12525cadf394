//! CoinGecko public API
//!
//! Live price from `simple/price`, historical daily snapshot from `coins/{id}/history`.

use chrono::NaiveDate;
use serde_json::Value;

use super::{price_value, HistoricalPoint, HistoricalSource, PriceSource};

const COINGECKO_REST_URL: &str = "https://api.coingecko.com/api/v3";

const COINGECKO_EARLIEST: (i32, u32, u32) = (2013, 4, 28);

/// `GET /api/v3/simple/price?ids={id}&vs_currencies=usd` -> `{"bitcoin":{"usd":65000}}`
#[derive(Debug, Clone)]
pub struct CoinGeckoSimple {
    coin_id: String,
}

impl CoinGeckoSimple {
    pub fn new(coin_id: impl Into<String>) -> Self {
        Self {
            coin_id: coin_id.into(),
        }
    }
}

impl PriceSource for CoinGeckoSimple {
    fn name(&self) -> &'static str {
        "CoinGecko"
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            COINGECKO_REST_URL, self.coin_id
        )
    }

    fn parse(&self, body: &Value) -> Option<f64> {
        price_value(body.get(&self.coin_id)?.get("usd")?)
    }
}

/// `GET /api/v3/coins/{id}/history?date={dd-mm-yyyy}` -> `{"market_data":{"current_price":{"usd":...}}}`
///
/// The payload carries no date of its own: a price is the snapshot for the
/// requested day, and a missing `market_data` block means the day has no data.
#[derive(Debug, Clone)]
pub struct CoinGeckoHistory {
    coin_id: String,
}

impl CoinGeckoHistory {
    pub fn new(coin_id: impl Into<String>) -> Self {
        Self {
            coin_id: coin_id.into(),
        }
    }
}

impl HistoricalSource for CoinGeckoHistory {
    fn name(&self) -> &'static str {
        "CoinGecko"
    }

    fn earliest_date(&self) -> NaiveDate {
        let (y, m, d) = COINGECKO_EARLIEST;
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }

    fn endpoint(&self, date: NaiveDate) -> String {
        format!(
            "{}/coins/{}/history?date={}&localization=false",
            COINGECKO_REST_URL,
            self.coin_id,
            date.format("%d-%m-%Y")
        )
    }

    fn parse(&self, body: &Value, requested: NaiveDate) -> Option<HistoricalPoint> {
        let price = price_value(body.pointer("/market_data/current_price/usd")?)?;
        Some(HistoricalPoint {
            date: requested,
            price,
        })
    }
}
