//! Ordered fallback resolver
//!
//! Tries sources one at a time in priority order and stops at the first
//! success. Lower-priority sources are only called when everything above
//! them failed.

use std::sync::Arc;
use std::time::Duration;

use crate::error::OracleError;
use crate::oracle::fetcher::fetch;
use crate::oracle::sources::PriceSource;
use crate::oracle::transport::HttpTransport;
use crate::oracle::PriceSample;
use crate::types::AssetSymbol;

/// Best available live price for `symbol`.
///
/// Fails with [`OracleError::AllSourcesFailed`] carrying one reason per
/// source, in the order they were tried, plus the effective proxy.
pub async fn resolve_best(
    transport: &dyn HttpTransport,
    sources: &[Arc<dyn PriceSource>],
    symbol: &AssetSymbol,
    timeout: Duration,
) -> Result<PriceSample, OracleError> {
    let mut errors = Vec::with_capacity(sources.len());

    for (rank, source) in sources.iter().enumerate() {
        let outcome = fetch(transport, source.as_ref(), symbol, timeout).await;

        if let Some(sample) = outcome.sample {
            if rank > 0 {
                tracing::info!(
                    symbol = %symbol,
                    source = %sample.source,
                    failed_before = rank,
                    "Resolved price from fallback source"
                );
            }
            return Ok(sample);
        }

        let reason = outcome.failure_reason();
        tracing::warn!(
            symbol = %symbol,
            source = %outcome.source,
            class = %outcome.class,
            reason = %reason,
            "Price source failed, trying next"
        );
        errors.push(reason);
    }

    Err(OracleError::AllSourcesFailed {
        symbol: symbol.to_string(),
        errors,
        proxy: transport.proxy_url(),
    })
}
