use chrono::{Duration, NaiveDate};
use serde_json::Value;

use super::{
    date_from_millis, day_start_millis, price_value, HistoricalPoint, HistoricalSource,
    PriceSource,
};

const COINCAP_REST_URL: &str = "https://api.coincap.io/v2";

const COINCAP_EARLIEST: (i32, u32, u32) = (2013, 1, 1);

/// `GET /v2/assets/{id}` -> `{"data":{"id":"bitcoin","priceUsd":"65000.1234"}}`
#[derive(Debug, Clone)]
pub struct CoinCapAsset {
    asset_id: String,
}

impl CoinCapAsset {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
        }
    }
}

impl PriceSource for CoinCapAsset {
    fn name(&self) -> &'static str {
        "CoinCap"
    }

    fn endpoint(&self) -> String {
        format!("{}/assets/{}", COINCAP_REST_URL, self.asset_id)
    }

    fn parse(&self, body: &Value) -> Option<f64> {
        price_value(body.pointer("/data/priceUsd")?)
    }
}

/// `GET /v2/assets/{id}/history?interval=d1&start={ms}&end={ms}`
/// -> `{"data":[{"priceUsd":"...","time":1704067200000,"date":"2024-01-01T00:00:00.000Z"}]}`
#[derive(Debug, Clone)]
pub struct CoinCapHistory {
    asset_id: String,
}

impl CoinCapHistory {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
        }
    }
}

impl HistoricalSource for CoinCapHistory {
    fn name(&self) -> &'static str {
        "CoinCap"
    }

    fn earliest_date(&self) -> NaiveDate {
        let (y, m, d) = COINCAP_EARLIEST;
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }

    fn endpoint(&self, date: NaiveDate) -> String {
        let start = day_start_millis(date);
        let end = start + Duration::days(1).num_milliseconds() - 1;
        format!(
            "{}/assets/{}/history?interval=d1&start={}&end={}",
            COINCAP_REST_URL, self.asset_id, start, end
        )
    }

    fn parse(&self, body: &Value, _requested: NaiveDate) -> Option<HistoricalPoint> {
        let entry = body.get("data")?.get(0)?;
        let price = price_value(entry.get("priceUsd")?)?;
        let date = entry
            .get("time")
            .and_then(Value::as_i64)
            .and_then(date_from_millis)
            .or_else(|| {
                let raw = entry.get("date")?.as_str()?;
                NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
            })?;

        Some(HistoricalPoint { date, price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn asset_price_is_a_string() {
        let source = CoinCapAsset::new("bitcoin");
        assert_eq!(
            source.parse(&json!({"data": {"id": "bitcoin", "priceUsd": "64990.5"}})),
            Some(64990.5)
        );
        assert_eq!(source.parse(&json!({"error": "bitcoin2 not found"})), None);
    }

    #[test]
    fn history_window_covers_one_day() {
        let source = CoinCapHistory::new("bitcoin");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(source
            .endpoint(date)
            .ends_with("history?interval=d1&start=1704067200000&end=1704153599999"));
    }

    #[test]
    fn history_reports_provider_date() {
        let source = CoinCapHistory::new("bitcoin");
        let requested = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let body = json!({"data": [{"priceUsd": "42000.1", "time": 1_704_067_200_000_i64}]});

        let point = source.parse(&body, requested).unwrap();
        assert_eq!(point.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(point.price, 42000.1);
    }

    #[test]
    fn history_falls_back_to_iso_date_field() {
        let source = CoinCapHistory::new("bitcoin");
        let requested = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let body = json!({"data": [{"priceUsd": "42000.1", "date": "2024-01-01T00:00:00.000Z"}]});
        assert_eq!(source.parse(&body, requested).map(|p| p.date), Some(requested));
        assert_eq!(source.parse(&json!({"data": []}), requested), None);
    }
}
