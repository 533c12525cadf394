use serde_json::Value;

use super::{price_value, PriceSource};

const OKX_REST_URL: &str = "https://www.okx.com/api/v5";

/// `GET /api/v5/market/ticker?instId={PAIR}` -> `{"code":"0","data":[{"last":"64950.00",...}]}`
#[derive(Debug, Clone)]
pub struct OkxTicker {
    inst_id: String,
}

impl OkxTicker {
    pub fn new(inst_id: impl Into<String>) -> Self {
        Self {
            inst_id: inst_id.into(),
        }
    }
}

impl PriceSource for OkxTicker {
    fn name(&self) -> &'static str {
        "OKX"
    }

    fn endpoint(&self) -> String {
        format!("{}/market/ticker?instId={}", OKX_REST_URL, self.inst_id)
    }

    fn parse(&self, body: &Value) -> Option<f64> {
        price_value(body.get("data")?.get(0)?.get("last")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_last_of_first_entry() {
        let source = OkxTicker::new("BTC-USDT");
        let body = json!({"code": "0", "msg": "", "data": [{"instId": "BTC-USDT", "last": "64950.00"}]});
        assert_eq!(source.parse(&body), Some(64950.00));
    }

    #[test]
    fn empty_data_is_no_price() {
        let source = OkxTicker::new("BTC-USDT");
        assert_eq!(source.parse(&json!({"code": "51001", "data": []})), None);
        assert_eq!(source.parse(&json!({"data": [{"last": ""}]})), None);
    }
}
