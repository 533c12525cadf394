//! Binance REST client for spot prices
//!
//! Live price from the ticker endpoint, historical daily open from klines.

use chrono::NaiveDate;
use serde_json::Value;

use super::{
    date_from_millis, day_start_millis, price_value, HistoricalPoint, HistoricalSource,
    PriceSource,
};

const BINANCE_REST_URL: &str = "https://api.binance.com/api/v3";

/// Binance spot history starts with the BTCUSDT listing.
const BINANCE_EARLIEST: (i32, u32, u32) = (2017, 8, 17);

/// `GET /api/v3/ticker/price?symbol={PAIR}` -> `{"symbol":"BTCUSDT","price":"65000.50"}`
#[derive(Debug, Clone)]
pub struct BinanceTicker {
    pair: String,
}

impl BinanceTicker {
    pub fn new(pair: impl Into<String>) -> Self {
        Self { pair: pair.into() }
    }
}

impl PriceSource for BinanceTicker {
    fn name(&self) -> &'static str {
        "Binance"
    }

    fn endpoint(&self) -> String {
        format!("{}/ticker/price?symbol={}", BINANCE_REST_URL, self.pair)
    }

    fn parse(&self, body: &Value) -> Option<f64> {
        price_value(body.get("price")?)
    }
}

/// Daily klines: `[[open_time, open, high, low, close, volume, close_time, ...], ...]`
#[derive(Debug, Clone)]
pub struct BinanceKlines {
    pair: String,
}

impl BinanceKlines {
    pub fn new(pair: impl Into<String>) -> Self {
        Self { pair: pair.into() }
    }
}

impl HistoricalSource for BinanceKlines {
    fn name(&self) -> &'static str {
        "Binance"
    }

    fn earliest_date(&self) -> NaiveDate {
        let (y, m, d) = BINANCE_EARLIEST;
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }

    fn endpoint(&self, date: NaiveDate) -> String {
        format!(
            "{}/klines?symbol={}&interval=1d&startTime={}&limit=1",
            BINANCE_REST_URL,
            self.pair,
            day_start_millis(date)
        )
    }

    fn parse(&self, body: &Value, _requested: NaiveDate) -> Option<HistoricalPoint> {
        let kline = body.as_array()?.first()?.as_array()?;
        let open_time = kline.first()?.as_i64()?;
        let price = price_value(kline.get(1)?)?;

        Some(HistoricalPoint {
            date: date_from_millis(open_time)?,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ticker_parses_string_price() {
        let source = BinanceTicker::new("BTCUSDT");
        let body = json!({"symbol": "BTCUSDT", "price": "65000.50"});
        assert_eq!(source.parse(&body), Some(65000.50));
        assert_eq!(
            source.endpoint(),
            "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT"
        );
    }

    #[test]
    fn ticker_rejects_error_payload() {
        let source = BinanceTicker::new("BTCUSDT");
        let body = json!({"code": -1121, "msg": "Invalid symbol."});
        assert_eq!(source.parse(&body), None);
        assert_eq!(source.parse(&json!([])), None);
    }

    #[test]
    fn klines_reads_open_of_first_candle() {
        let source = BinanceKlines::new("ETHUSDT");
        let body = json!([[
            1_704_067_200_000_i64,
            "2281.87",
            "2352.37",
            "2265.24",
            "2352.04",
            "216702.6842",
            1_704_153_599_999_i64
        ]]);
        let requested = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let point = source.parse(&body, requested).unwrap();
        assert_eq!(point.date, requested);
        assert_eq!(point.price, 2281.87);
        assert!(source
            .endpoint(requested)
            .ends_with("klines?symbol=ETHUSDT&interval=1d&startTime=1704067200000&limit=1"));
    }

    #[test]
    fn klines_empty_array_is_no_price() {
        let source = BinanceKlines::new("ETHUSDT");
        let requested = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(source.parse(&json!([]), requested), None);
        assert_eq!(source.parse(&json!([["x", "1.0"]]), requested), None);
    }
}
