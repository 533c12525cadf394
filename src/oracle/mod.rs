//! Oracle module - Multi-source price resolution
//!
//! Queries public price APIs (Binance, OKX, CoinPaprika, CoinGecko, CoinCap)
//! and turns their answers into either one trustworthy number or a
//! diagnosable failure.
//!
//! - [`PriceOracle::probe_all`]: every source concurrently, settle-all, with summary stats
//! - [`PriceOracle::resolve_best`]: sources one by one in priority order, first success wins
//! - [`PriceOracle::resolve_historical`]: exact-day lookup with bounded retries
//! - [`PriceOracle::quote`]: current + historical price pair for the UI layer

mod aggregator;
mod fallback;
mod fetcher;
mod historical;
mod probe;
mod registry;
mod resolver;
mod retry;
pub mod sources;
pub mod transport;

pub use aggregator::{summarize, AggregateSummary};
pub use fallback::{StaticFallbackTable, StaticQuote, StaticSeries};
pub use fetcher::{fetch, fetch_json, FetchFailure};
pub use historical::{resolve_historical, HistoricalResult};
pub use probe::{probe_sources, probe_sources_until, FanOut};
pub use registry::{HistoricalProvider, RegistryEntry, SourceListing, SourceRegistry};
pub use resolver::resolve_best;
pub use retry::{retry, RetryExhausted, RetryPolicy};
pub use transport::{HttpResponse, HttpTransport, ProxyConfig, ReqwestTransport, TransportError};

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::error::OracleError;
use crate::types::{AssetClass, AssetSymbol};

/// Successful price observation from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSample {
    pub price: f64,
    pub source: String,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Categorical result of one fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeClass {
    Success,
    Timeout,
    NetworkError,
    HttpError,
    CorsBlocked,
    ParseFailure,
}

impl OutcomeClass {
    /// Human-readable label used in failure messages.
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeClass::Success => "success",
            OutcomeClass::Timeout => "timeout",
            OutcomeClass::NetworkError => "network error",
            OutcomeClass::HttpError => "HTTP error",
            OutcomeClass::CorsBlocked => "CORS blocked",
            OutcomeClass::ParseFailure => "parse failure",
        }
    }
}

impl fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            OutcomeClass::Success => "success",
            OutcomeClass::Timeout => "timeout",
            OutcomeClass::NetworkError => "networkError",
            OutcomeClass::HttpError => "httpError",
            OutcomeClass::CorsBlocked => "corsBlocked",
            OutcomeClass::ParseFailure => "parseFailure",
        };
        f.write_str(tag)
    }
}

/// One (symbol, source) attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub source: String,
    pub url: String,
    pub class: OutcomeClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<PriceSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SourceOutcome {
    pub fn success(url: impl Into<String>, sample: PriceSample) -> Self {
        Self {
            source: sample.source.clone(),
            url: url.into(),
            class: OutcomeClass::Success,
            http_status: None,
            sample: Some(sample),
            error_message: None,
        }
    }

    pub fn failure(source: &str, url: impl Into<String>, failure: FetchFailure) -> Self {
        Self {
            source: source.to_string(),
            url: url.into(),
            class: failure.class,
            http_status: failure.http_status,
            sample: None,
            error_message: Some(failure.message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.class == OutcomeClass::Success
    }

    /// `[Source] class: message (url)` line for error logs.
    pub fn failure_reason(&self) -> String {
        let message = self.error_message.as_deref().unwrap_or("no detail");
        format!(
            "[{}] {}: {} ({})",
            self.source,
            self.class.label(),
            message,
            self.url
        )
    }
}

/// Diagnostic probe response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub symbol: AssetSymbol,
    pub outcomes: Vec<SourceOutcome>,
    pub summary: AggregateSummary,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

/// Best-price request from the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub symbol: String,
    pub years_ago: u32,
    /// Permits the static table; only honoured for equity proxies
    pub allow_static_fallback: bool,
}

impl QuoteRequest {
    pub fn new(symbol: impl Into<String>, years_ago: u32) -> Self {
        Self {
            symbol: symbol.into(),
            years_ago,
            allow_static_fallback: false,
        }
    }

    pub fn allow_static_fallback(mut self, allow: bool) -> Self {
        self.allow_static_fallback = allow;
        self
    }
}

/// Current and historical price pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: AssetSymbol,
    pub current_price: f64,
    pub history_price: f64,
    pub history_date: String,
    pub source: String,
    pub history_source: String,
    pub static_fallback: bool,
}

/// Deadlines and retry schedule used by [`PriceOracle`]
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    pub probe_timeout: Duration,
    pub live_timeout: Duration,
    pub historical_timeout: Duration,
    pub historical_retry: RetryPolicy,
    pub user_agent: String,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(8_000),
            live_timeout: Duration::from_millis(5_000),
            historical_timeout: Duration::from_millis(15_000),
            historical_retry: RetryPolicy::default(),
            user_agent: concat!("price-oracle/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

enum TransportMode {
    /// Resolve the proxy from the environment on every request
    Environment,
    Fixed(Arc<dyn HttpTransport>),
}

/// Entry point tying the registry, transport and settings together
pub struct PriceOracle {
    registry: Arc<SourceRegistry>,
    fallback: StaticFallbackTable,
    settings: OracleSettings,
    transport: TransportMode,
}

impl PriceOracle {
    /// Oracle using reqwest with the proxy read from the environment per request.
    pub fn new(registry: SourceRegistry, settings: OracleSettings) -> Self {
        Self {
            registry: Arc::new(registry),
            fallback: StaticFallbackTable::builtin(),
            settings,
            transport: TransportMode::Environment,
        }
    }

    /// Oracle bound to one transport (tests, custom clients).
    pub fn with_transport(
        registry: SourceRegistry,
        settings: OracleSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport: TransportMode::Fixed(transport),
            ..Self::new(registry, settings)
        }
    }

    pub fn with_fallback_table(mut self, table: StaticFallbackTable) -> Self {
        self.fallback = table;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &OracleSettings {
        &self.settings
    }

    fn transport(&self) -> Arc<dyn HttpTransport> {
        match &self.transport {
            TransportMode::Environment => {
                Arc::new(ReqwestTransport::from_env(&self.settings.user_agent))
            }
            TransportMode::Fixed(transport) => Arc::clone(transport),
        }
    }

    /// Query every source of `symbol` concurrently and summarize.
    pub async fn probe_all(&self, symbol: &str) -> Result<ProbeReport, OracleError> {
        self.probe_all_until(symbol, std::future::pending()).await
    }

    /// [`probe_all`](Self::probe_all) that stops when `cancel` completes,
    /// reporting only the outcomes settled by then.
    pub async fn probe_all_until<C>(&self, symbol: &str, cancel: C) -> Result<ProbeReport, OracleError>
    where
        C: Future<Output = ()>,
    {
        let symbol = AssetSymbol::parse(symbol)?;
        let sources = self.registry.sources_for(&symbol)?;
        let transport = self.transport();
        let span = tracing::info_span!("probe", request_id = %uuid::Uuid::new_v4(), symbol = %symbol);

        let report = async {
            let fan_out = probe_sources_until(
                transport.as_ref(),
                sources,
                &symbol,
                self.settings.probe_timeout,
                cancel,
            )
            .await;
            let summary = summarize(&fan_out.outcomes);

            tracing::info!(
                total = summary.total,
                success = summary.success_count,
                timeout = summary.timeout_count,
                error = summary.error_count,
                cors = summary.cors_count,
                median = ?summary.median_price,
                spread = ?summary.spread(),
                "✅ Probe settled"
            );

            ProbeReport {
                symbol: symbol.clone(),
                outcomes: fan_out.outcomes,
                summary,
                cancelled: fan_out.cancelled,
                proxy: transport.proxy_url(),
            }
        }
        .instrument(span)
        .await;

        Ok(report)
    }

    /// First successful live price, trying sources in priority order.
    pub async fn resolve_best(&self, symbol: &str) -> Result<PriceSample, OracleError> {
        let symbol = AssetSymbol::parse(symbol)?;
        self.resolve_best_for(&symbol).await
    }

    async fn resolve_best_for(&self, symbol: &AssetSymbol) -> Result<PriceSample, OracleError> {
        let sources = self.registry.sources_for(symbol)?;
        let transport = self.transport();
        let span =
            tracing::info_span!("resolve_best", request_id = %uuid::Uuid::new_v4(), symbol = %symbol);

        resolve_best(transport.as_ref(), sources, symbol, self.settings.live_timeout)
            .instrument(span)
            .await
    }

    /// Price of `symbol` on `date` (UTC calendar day).
    pub async fn resolve_historical(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<HistoricalResult, OracleError> {
        self.resolve_historical_as_of(symbol, date, Utc::now().date_naive())
            .await
    }

    /// [`resolve_historical`](Self::resolve_historical) with an explicit "today".
    pub async fn resolve_historical_as_of(
        &self,
        symbol: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<HistoricalResult, OracleError> {
        let symbol = AssetSymbol::parse(symbol)?;
        self.resolve_historical_for(&symbol, date, today).await
    }

    async fn resolve_historical_for(
        &self,
        symbol: &AssetSymbol,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<HistoricalResult, OracleError> {
        let source = self.registry.historical_source_for(symbol)?;
        let transport = self.transport();
        let span = tracing::info_span!(
            "resolve_historical",
            request_id = %uuid::Uuid::new_v4(),
            symbol = %symbol,
            date = %date
        );

        resolve_historical(
            transport.as_ref(),
            source.as_ref(),
            symbol,
            date,
            today,
            self.settings.historical_timeout,
            &self.settings.historical_retry,
        )
        .instrument(span)
        .await
    }

    /// Current price plus the price `years_ago` years back.
    pub async fn quote(&self, request: QuoteRequest) -> Result<PriceQuote, OracleError> {
        self.quote_as_of(request, Utc::now().date_naive()).await
    }

    /// [`quote`](Self::quote) with an explicit "today".
    pub async fn quote_as_of(
        &self,
        request: QuoteRequest,
        today: NaiveDate,
    ) -> Result<PriceQuote, OracleError> {
        let symbol = AssetSymbol::parse(&request.symbol)?;
        let entry = self
            .registry
            .entry(&symbol)
            .ok_or_else(|| OracleError::UnsupportedSymbol(symbol.to_string()))?;

        if entry.class == AssetClass::EquityProxy {
            if !request.allow_static_fallback {
                return Err(OracleError::StaticFallbackNotAllowed(symbol.to_string()));
            }
            let fixed = self.fallback.quote(&symbol, request.years_ago)?;
            tracing::info!(
                symbol = %symbol,
                as_of_year = fixed.as_of_year,
                history_year = fixed.history_year,
                "Answering from static fallback table"
            );
            return Ok(PriceQuote {
                symbol,
                current_price: fixed.current_price,
                history_price: fixed.history_price,
                history_date: format!("{}-12-31", fixed.history_year),
                source: "static-table".to_string(),
                history_source: "static-table".to_string(),
                static_fallback: true,
            });
        }

        let source = self.registry.historical_source_for(&symbol)?;
        let history_date = today
            .checked_sub_months(Months::new(request.years_ago.saturating_mul(12)))
            .ok_or_else(|| OracleError::BeforeEarliestDate {
                symbol: symbol.to_string(),
                date: NaiveDate::MIN,
                earliest: source.earliest_date(),
                source_name: source.name().to_string(),
            })?;
        if history_date < source.earliest_date() {
            return Err(OracleError::BeforeEarliestDate {
                symbol: symbol.to_string(),
                date: history_date,
                earliest: source.earliest_date(),
                source_name: source.name().to_string(),
            });
        }

        let current = self.resolve_best_for(&symbol).await?;
        let history = self
            .resolve_historical_for(&symbol, history_date, today)
            .await?;

        Ok(PriceQuote {
            symbol,
            current_price: current.price,
            history_price: history.price,
            history_date: history.date,
            source: current.source,
            history_source: history.source,
            static_fallback: false,
        })
    }
}
