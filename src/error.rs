//! Oracle error taxonomy
//!
//! Per-source failures never surface here: the fetcher encodes them as
//! [`OutcomeClass`](crate::oracle::OutcomeClass) values. These errors are the
//! terminal results of a whole request.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// Symbol not in the registry (or malformed). No network call was made.
    #[error("unsupported symbol: {0}")]
    UnsupportedSymbol(String),

    /// Symbol has no live source and the caller did not opt into the static table.
    #[error("{0} has no live price source; static fallback was not allowed for this request")]
    StaticFallbackNotAllowed(String),

    #[error("static fallback table has no {what} for {symbol}")]
    StaticFallbackMissing { symbol: String, what: String },

    #[error("no historical price source registered for {0}")]
    NoHistoricalSource(String),

    #[error("requested date {date} for {symbol} is in the future (today is {today})")]
    FutureDate {
        symbol: String,
        date: NaiveDate,
        today: NaiveDate,
    },

    #[error("requested date {date} for {symbol} precedes the earliest date {earliest} supported by {source_name}")]
    BeforeEarliestDate {
        symbol: String,
        date: NaiveDate,
        earliest: NaiveDate,
        source_name: String,
    },

    /// Every live source failed; `errors` keeps one entry per attempted source, in order.
    #[error(
        "all {} price sources failed for {symbol} (proxy: {}): {}",
        .errors.len(),
        proxy_label(.proxy),
        .errors.join("; ")
    )]
    AllSourcesFailed {
        symbol: String,
        errors: Vec<String>,
        proxy: Option<String>,
    },

    #[error(
        "historical price for {symbol} on {date} unavailable from {source_name} after {attempts} attempt(s) (proxy: {}): {last_error}",
        proxy_label(.proxy)
    )]
    HistoricalUnavailable {
        symbol: String,
        date: NaiveDate,
        source_name: String,
        attempts: u32,
        last_error: String,
        proxy: Option<String>,
    },
}

fn proxy_label(proxy: &Option<String>) -> &str {
    proxy.as_deref().unwrap_or("direct")
}

impl OracleError {
    /// True for errors caused by the request itself rather than upstream failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSymbol(_)
                | Self::StaticFallbackNotAllowed(_)
                | Self::StaticFallbackMissing { .. }
                | Self::NoHistoricalSource(_)
                | Self::FutureDate { .. }
                | Self::BeforeEarliestDate { .. }
        )
    }

    /// Per-source failure reasons carried by composite errors.
    pub fn failure_log(&self) -> Vec<String> {
        match self {
            Self::AllSourcesFailed { errors, .. } => errors.clone(),
            Self::HistoricalUnavailable {
                source_name,
                last_error,
                ..
            } => vec![format!("[{source_name}] {last_error}")],
            _ => Vec::new(),
        }
    }

    /// Effective proxy used by the failed request, if any.
    pub fn proxy(&self) -> Option<&str> {
        match self {
            Self::AllSourcesFailed { proxy, .. } | Self::HistoricalUnavailable { proxy, .. } => {
                proxy.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_failed_message_keeps_every_reason_and_proxy() {
        let err = OracleError::AllSourcesFailed {
            symbol: "BTC".to_string(),
            errors: vec![
                "[Binance] timeout after 5000ms".to_string(),
                "[OKX] network error: connection refused".to_string(),
            ],
            proxy: Some("http://proxy.local:3128".to_string()),
        };

        let message = err.to_string();
        assert!(message.contains("all 2 price sources failed for BTC"));
        assert!(message.contains("[Binance] timeout after 5000ms"));
        assert!(message.contains("[OKX] network error: connection refused"));
        assert!(message.contains("http://proxy.local:3128"));
        assert_eq!(err.failure_log().len(), 2);
        assert!(!err.is_client_error());
    }

    #[test]
    fn direct_connection_is_labelled() {
        let err = OracleError::AllSourcesFailed {
            symbol: "ETH".to_string(),
            errors: vec![],
            proxy: None,
        };
        assert!(err.to_string().contains("proxy: direct"));
        assert_eq!(err.proxy(), None);
    }
}
