use serde_json::Value;

use super::{price_value, PriceSource};

const COINPAPRIKA_REST_URL: &str = "https://api.coinpaprika.com/v1";

/// `GET /v1/tickers/{id}` -> `{"quotes":{"USD":{"price":65010.12}}}`
#[derive(Debug, Clone)]
pub struct CoinPaprikaTicker {
    coin_id: String,
}

impl CoinPaprikaTicker {
    pub fn new(coin_id: impl Into<String>) -> Self {
        Self {
            coin_id: coin_id.into(),
        }
    }
}

impl PriceSource for CoinPaprikaTicker {
    fn name(&self) -> &'static str {
        "CoinPaprika"
    }

    fn endpoint(&self) -> String {
        format!("{}/tickers/{}", COINPAPRIKA_REST_URL, self.coin_id)
    }

    fn parse(&self, body: &Value) -> Option<f64> {
        price_value(body.pointer("/quotes/USD/price")?)
    }
}
