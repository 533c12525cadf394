//! Single (symbol, source) fetch with outcome classification
//!
//! `fetch` never fails: every branch ends in a [`SourceOutcome`].

use serde_json::Value;
use std::time::{Duration, Instant};

use crate::oracle::sources::PriceSource;
use crate::oracle::transport::{HttpTransport, TransportError};
use crate::oracle::{OutcomeClass, PriceSample, SourceOutcome};
use crate::types::AssetSymbol;

/// Longest upstream error body kept in an outcome message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Why a JSON fetch did not produce a usable document
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub class: OutcomeClass,
    pub http_status: Option<u16>,
    pub message: String,
}

impl FetchFailure {
    fn new(class: OutcomeClass, message: impl Into<String>) -> Self {
        Self {
            class,
            http_status: None,
            message: message.into(),
        }
    }

    pub(crate) fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(OutcomeClass::ParseFailure, message)
    }
}

/// GET `url` under a deadline and decode the body as JSON.
///
/// The deadline is enforced here as well as in the transport, so a transport
/// that ignores it still cannot hold the caller past `timeout`.
pub async fn fetch_json(
    transport: &dyn HttpTransport,
    url: &str,
    timeout: Duration,
) -> Result<Value, FetchFailure> {
    let response = match tokio::time::timeout(timeout, transport.get(url, timeout)).await {
        Err(_) => Err(TransportError::Timeout(timeout)),
        Ok(result) => result,
    };

    let response = match response {
        Ok(response) => response,
        Err(TransportError::Timeout(after)) => {
            return Err(FetchFailure::new(
                OutcomeClass::Timeout,
                format!("timeout after {}ms", after.as_millis()),
            ));
        }
        Err(TransportError::Network(message)) => {
            let class = if is_cors_block(&message) {
                OutcomeClass::CorsBlocked
            } else {
                OutcomeClass::NetworkError
            };
            return Err(FetchFailure::new(class, message));
        }
    };

    if !response.is_success() {
        let body = truncate(response.body.trim(), MAX_ERROR_BODY_CHARS);
        let message = if body.is_empty() {
            format!("HTTP {}", response.status)
        } else {
            format!("HTTP {}: {}", response.status, body)
        };
        return Err(FetchFailure {
            class: OutcomeClass::HttpError,
            http_status: Some(response.status),
            message,
        });
    }

    serde_json::from_str(&response.body)
        .map_err(|e| FetchFailure::parse_failure(format!("invalid JSON: {e}")))
}

/// Fetch the current price of `symbol` from one source.
pub async fn fetch(
    transport: &dyn HttpTransport,
    source: &dyn PriceSource,
    symbol: &AssetSymbol,
    timeout: Duration,
) -> SourceOutcome {
    let url = source.endpoint();
    let started = Instant::now();

    let result = fetch_json(transport, &url, timeout).await.and_then(|body| {
        source
            .parse(&body)
            .filter(|price| price.is_finite() && *price > 0.0)
            .ok_or_else(|| FetchFailure::parse_failure("response did not contain a usable price"))
    });
    let latency_ms = started.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(price) => SourceOutcome::success(
            url,
            PriceSample {
                price,
                source: source.name().to_string(),
                latency_ms,
                timestamp: chrono::Utc::now(),
            },
        ),
        Err(failure) => SourceOutcome::failure(source.name(), url, failure),
    };

    tracing::debug!(
        symbol = %symbol,
        source = %outcome.source,
        class = %outcome.class,
        latency_ms,
        "Price fetch settled"
    );

    outcome
}

/// Browsers surface CORS rejections as generic network errors; recognise them by text.
fn is_cors_block(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("cors") || lower.contains("cross-origin") || lower.contains("access-control-allow-origin")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
