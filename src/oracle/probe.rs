//! Diagnostic fan-out
//!
//! Queries every source of a symbol at once and waits for all of them to
//! settle. A slow or failing source never hides the others: each call is
//! bounded by its own deadline and reported in registry order.

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::oracle::fetcher::fetch;
use crate::oracle::sources::PriceSource;
use crate::oracle::transport::HttpTransport;
use crate::oracle::SourceOutcome;
use crate::types::AssetSymbol;

/// Result of a fan-out that may have been cut short
#[derive(Debug, Clone)]
pub struct FanOut {
    /// Settled outcomes, in the order the sources were given
    pub outcomes: Vec<SourceOutcome>,
    pub cancelled: bool,
}

/// Fetch from every source concurrently and wait for all of them.
pub async fn probe_sources(
    transport: &dyn HttpTransport,
    sources: &[Arc<dyn PriceSource>],
    symbol: &AssetSymbol,
    timeout: Duration,
) -> Vec<SourceOutcome> {
    probe_sources_until(transport, sources, symbol, timeout, std::future::pending())
        .await
        .outcomes
}

/// Like [`probe_sources`], but stops when `cancel` completes.
///
/// In-flight fetches are dropped on cancellation; the outcomes that had
/// already settled are still returned.
pub async fn probe_sources_until<C>(
    transport: &dyn HttpTransport,
    sources: &[Arc<dyn PriceSource>],
    symbol: &AssetSymbol,
    timeout: Duration,
    cancel: C,
) -> FanOut
where
    C: Future<Output = ()>,
{
    let mut pending: FuturesUnordered<_> = sources
        .iter()
        .enumerate()
        .map(|(idx, source)| async move {
            (idx, fetch(transport, source.as_ref(), symbol, timeout).await)
        })
        .collect();

    let mut slots: Vec<Option<SourceOutcome>> = sources.iter().map(|_| None).collect();
    let mut cancelled = false;

    tokio::pin!(cancel);
    loop {
        tokio::select! {
            next = pending.next() => match next {
                Some((idx, outcome)) => slots[idx] = Some(outcome),
                None => break,
            },
            _ = &mut cancel => {
                cancelled = true;
                break;
            }
        }
    }

    if cancelled {
        tracing::warn!(
            symbol = %symbol,
            settled = slots.iter().filter(|s| s.is_some()).count(),
            in_flight = pending.len(),
            "Probe cancelled, returning settled outcomes"
        );
    }
    drop(pending);

    FanOut {
        outcomes: slots.into_iter().flatten().collect(),
        cancelled,
    }
}
