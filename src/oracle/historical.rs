//! Historical price resolver
//!
//! Fetches the price recorded for one exact calendar day. The resolver never
//! substitutes a neighbouring day: a provider answering with a different date
//! is a failure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::OracleError;
use crate::oracle::fetcher::{fetch_json, FetchFailure};
use crate::oracle::retry::{retry, RetryPolicy};
use crate::oracle::sources::{positive_price, HistoricalSource};
use crate::oracle::transport::HttpTransport;
use crate::types::AssetSymbol;

/// Price of an asset on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalResult {
    pub price: f64,
    /// `YYYY-MM-DD`, always the requested day
    pub date: String,
    pub source: String,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum AttemptError {
    Fetch(FetchFailure),
    DateMismatch { expected: NaiveDate, got: NaiveDate },
}

impl AttemptError {
    /// Upstream hiccups are worth another try; a wrong date will not change.
    fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(failure) => {
                write!(f, "{}: {}", failure.class.label(), failure.message)
            }
            Self::DateMismatch { expected, got } => {
                write!(f, "provider returned data for {got} instead of {expected}")
            }
        }
    }
}

/// Resolve the price of `symbol` on `target`, judging "future" against `today`.
pub async fn resolve_historical(
    transport: &dyn HttpTransport,
    source: &dyn HistoricalSource,
    symbol: &AssetSymbol,
    target: NaiveDate,
    today: NaiveDate,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<HistoricalResult, OracleError> {
    if target > today {
        return Err(OracleError::FutureDate {
            symbol: symbol.to_string(),
            date: target,
            today,
        });
    }

    let earliest = source.earliest_date();
    if target < earliest {
        return Err(OracleError::BeforeEarliestDate {
            symbol: symbol.to_string(),
            date: target,
            earliest,
            source_name: source.name().to_string(),
        });
    }

    let url = source.endpoint(target);

    let attempt_result = retry(
        policy,
        |attempt| {
            let url = url.as_str();
            async move {
                let result = fetch_point(transport, source, url, target, timeout).await;
                if let Err(e) = &result {
                    tracing::warn!(
                        symbol = %symbol,
                        source = %source.name(),
                        date = %target,
                        attempt = attempt + 1,
                        error = %e,
                        "Historical price attempt failed"
                    );
                }
                result
            }
        },
        AttemptError::is_transient,
    )
    .await;

    match attempt_result {
        Ok(price) => Ok(HistoricalResult {
            price,
            date: target.format("%Y-%m-%d").to_string(),
            source: source.name().to_string(),
            exists: true,
        }),
        Err(exhausted) => Err(OracleError::HistoricalUnavailable {
            symbol: symbol.to_string(),
            date: target,
            source_name: source.name().to_string(),
            attempts: exhausted.attempts,
            last_error: exhausted.last_error.to_string(),
            proxy: transport.proxy_url(),
        }),
    }
}

async fn fetch_point(
    transport: &dyn HttpTransport,
    source: &dyn HistoricalSource,
    url: &str,
    target: NaiveDate,
    timeout: Duration,
) -> Result<f64, AttemptError> {
    let body = fetch_json(transport, url, timeout)
        .await
        .map_err(AttemptError::Fetch)?;

    let point = source.parse(&body, target).ok_or_else(|| {
        AttemptError::Fetch(FetchFailure::parse_failure(format!(
            "no price for {target} in response"
        )))
    })?;

    if point.date != target {
        return Err(AttemptError::DateMismatch {
            expected: target,
            got: point.date,
        });
    }

    positive_price(point.price).ok_or_else(|| {
        AttemptError::Fetch(FetchFailure::parse_failure(format!(
            "unusable price {} for {target}",
            point.price
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::sources::BinanceKlines;
    use crate::oracle::transport::{HttpResponse, MockHttpTransport, TransportError};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn kline(date: NaiveDate, open: &str) -> String {
        let ms = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis();
        format!(r#"[[{ms},"{open}","1","1","1","1",{}]]"#, ms + 86_399_999)
    }

    fn btc() -> AssetSymbol {
        AssetSymbol::parse("BTC").unwrap()
    }

    #[tokio::test]
    async fn future_date_makes_no_call() {
        let mut transport = MockHttpTransport::new();
        transport.expect_get().never();
        let source = BinanceKlines::new("BTCUSDT");
        let today = day(2024, 6, 1);

        let err = resolve_historical(
            &transport,
            &source,
            &btc(),
            day(2024, 6, 2),
            today,
            Duration::from_secs(15),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OracleError::FutureDate { .. }));
    }

    #[tokio::test]
    async fn date_before_source_history_makes_no_call() {
        let mut transport = MockHttpTransport::new();
        transport.expect_get().never();
        let source = BinanceKlines::new("BTCUSDT");

        let err = resolve_historical(
            &transport,
            &source,
            &btc(),
            day(2016, 1, 1),
            day(2024, 6, 1),
            Duration::from_secs(15),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OracleError::BeforeEarliestDate { .. }));
    }

    #[tokio::test]
    async fn exact_date_resolves() {
        let target = day(2024, 1, 1);
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(move |_, _| Ok(HttpResponse::ok_json(kline(target, "42283.58"))));
        let source = BinanceKlines::new("BTCUSDT");

        let result = resolve_historical(
            &transport,
            &source,
            &btc(),
            target,
            day(2024, 6, 1),
            Duration::from_secs(15),
            &RetryPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            result,
            HistoricalResult {
                price: 42283.58,
                date: "2024-01-01".to_string(),
                source: "Binance".to_string(),
                exists: true,
            }
        );
    }

    #[tokio::test]
    async fn neighbouring_date_is_rejected_without_retry() {
        let target = day(2024, 1, 1);
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(move |_, _| Ok(HttpResponse::ok_json(kline(day(2024, 1, 2), "44000"))));
        transport.expect_proxy_url().returning(|| None);
        let source = BinanceKlines::new("BTCUSDT");

        let err = resolve_historical(
            &transport,
            &source,
            &btc(),
            target,
            day(2024, 6, 1),
            Duration::from_secs(15),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();

        match err {
            OracleError::HistoricalUnavailable {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 1);
                assert!(last_error.contains("2024-01-02"));
            }
            other => panic!("expected HistoricalUnavailable, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_three_times() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(3)
            .returning(|_, _| Err(TransportError::Network("connection reset".to_string())));
        transport.expect_proxy_url().returning(|| None);
        let source = BinanceKlines::new("BTCUSDT");

        let err = resolve_historical(
            &transport,
            &source,
            &btc(),
            day(2024, 1, 1),
            day(2024, 6, 1),
            Duration::from_secs(15),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();

        match &err {
            OracleError::HistoricalUnavailable {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(*attempts, 3);
                assert!(last_error.contains("connection reset"));
            }
            other => panic!("expected HistoricalUnavailable, got {other:?}"),
        }
        assert!(err.to_string().contains("proxy: direct"));
    }
}
