//! Oracle Aggregator - Summarizes a diagnostic probe
//!
//! Folds the per-source outcomes of one probe into counts by outcome class
//! plus mean and median over the successful prices.

use serde::{Deserialize, Serialize};

use crate::oracle::{OutcomeClass, SourceOutcome};

/// Summary statistics over one probe
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub total: usize,
    pub success_count: usize,
    pub timeout_count: usize,
    /// Network, HTTP and parse failures
    pub error_count: usize,
    pub cors_count: usize,
    pub average_price: Option<f64>,
    pub median_price: Option<f64>,
    /// Successful prices in outcome order
    pub raw_prices: Vec<f64>,
}

impl AggregateSummary {
    /// Largest relative gap between successful prices ((max - min) / min).
    pub fn spread(&self) -> Option<f64> {
        if self.raw_prices.is_empty() {
            return None;
        }
        let min = self.raw_prices.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self
            .raw_prices
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        Some((max - min) / min)
    }
}

/// Reduce outcomes to an [`AggregateSummary`].
pub fn summarize(outcomes: &[SourceOutcome]) -> AggregateSummary {
    let mut summary = AggregateSummary {
        total: outcomes.len(),
        ..AggregateSummary::default()
    };

    for outcome in outcomes {
        match outcome.class {
            OutcomeClass::Success => {
                summary.success_count += 1;
                if let Some(sample) = &outcome.sample {
                    summary.raw_prices.push(sample.price);
                }
            }
            OutcomeClass::Timeout => summary.timeout_count += 1,
            OutcomeClass::CorsBlocked => summary.cors_count += 1,
            OutcomeClass::NetworkError | OutcomeClass::HttpError | OutcomeClass::ParseFailure => {
                summary.error_count += 1
            }
        }
    }

    summary.average_price = mean(&summary.raw_prices);
    summary.median_price = median(&summary.raw_prices);
    summary
}

fn mean(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}

/// Element at `floor(n / 2)` of the ascending sort.
///
/// Even-sized sets yield the upper of the two middle values, not their average.
fn median(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.get(sorted.len() / 2).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::fetcher::FetchFailure;
    use crate::oracle::PriceSample;

    fn success(source: &str, price: f64) -> SourceOutcome {
        SourceOutcome::success(
            format!("https://{source}.test"),
            PriceSample {
                price,
                source: source.to_string(),
                latency_ms: 10,
                timestamp: chrono::Utc::now(),
            },
        )
    }

    fn failed(source: &'static str, class: OutcomeClass) -> SourceOutcome {
        SourceOutcome::failure(
            source,
            format!("https://{source}.test"),
            FetchFailure {
                class,
                http_status: None,
                message: "boom".to_string(),
            },
        )
    }

    #[test]
    fn test_summary_counts_every_class() {
        let outcomes = vec![
            success("binance", 100.0),
            failed("okx", OutcomeClass::Timeout),
            failed("paprika", OutcomeClass::NetworkError),
            failed("gecko", OutcomeClass::HttpError),
            failed("coincap", OutcomeClass::ParseFailure),
            failed("browser", OutcomeClass::CorsBlocked),
        ];

        let summary = summarize(&outcomes);
        assert_eq!(summary.total, 6);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.timeout_count, 1);
        assert_eq!(summary.error_count, 3);
        assert_eq!(summary.cors_count, 1);
        assert_eq!(
            summary.success_count + summary.timeout_count + summary.error_count + summary.cors_count,
            summary.total
        );
    }

    #[test]
    fn test_median_takes_upper_middle_for_even_sets() {
        let outcomes = vec![
            success("a", 65000.50),
            success("b", 64950.00),
            failed("c", OutcomeClass::Timeout),
        ];

        let summary = summarize(&outcomes);
        assert_eq!(summary.raw_prices, vec![65000.50, 64950.00]);
        assert_eq!(summary.average_price, Some(64975.25));
        assert_eq!(summary.median_price, Some(65000.50));
    }

    #[test]
    fn test_median_of_odd_set_is_middle() {
        let outcomes = vec![success("a", 3.0), success("b", 1.0), success("c", 2.0)];
        let summary = summarize(&outcomes);
        assert_eq!(summary.median_price, Some(2.0));
        assert_eq!(summary.average_price, Some(2.0));
    }

    #[test]
    fn test_no_successes_means_no_statistics() {
        let outcomes = vec![
            failed("a", OutcomeClass::Timeout),
            failed("b", OutcomeClass::HttpError),
        ];
        let summary = summarize(&outcomes);
        assert!(summary.raw_prices.is_empty());
        assert_eq!(summary.average_price, None);
        assert_eq!(summary.median_price, None);
        assert_eq!(summary.spread(), None);

        let empty = summarize(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.median_price, None);
    }

    #[test]
    fn test_spread_between_sources() {
        let summary = summarize(&[success("a", 100.0), success("b", 101.0)]);
        let spread = summary.spread().unwrap();
        assert!((spread - 0.01).abs() < 1e-12);
    }
}
