//! Price oracle CLI
//!
//! Usage:
//!   price-oracle probe BTC
//!   price-oracle best ETH --years-ago 3
//!   price-oracle history BTC 2024-01-01 --format json
//!   price-oracle serve            (feature `server`)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use price_oracle::config::AppConfig;
use price_oracle::oracle::{
    HistoricalResult, PriceOracle, PriceQuote, ProbeReport, QuoteRequest, SourceListing,
    SourceRegistry,
};
use price_oracle::AssetSymbol;

#[derive(Debug, Parser)]
#[command(name = "price-oracle", version, about = "Multi-source crypto price oracle")]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Query every source concurrently and print each outcome
    Probe { symbol: String },
    /// Current price plus the price N years ago
    Best {
        symbol: String,
        #[arg(long, default_value_t = 1)]
        years_ago: u32,
        /// Permit the static table for assets without a live source
        #[arg(long)]
        allow_static_fallback: bool,
    },
    /// Price on one calendar day (UTC)
    History {
        symbol: String,
        /// YYYY-MM-DD
        date: NaiveDate,
    },
    /// List registered symbols and their sources
    Sources { symbol: Option<String> },
    /// Run the HTTP API
    #[cfg(feature = "server")]
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    init_tracing(&config);

    tracing::debug!(config = %config, "Configuration loaded");

    let registry = SourceRegistry::with_defaults(config.historical_provider()?);
    let oracle = PriceOracle::new(registry, config.oracle_settings());

    match cli.command {
        Command::Probe { symbol } => {
            let report = oracle.probe_all_until(&symbol, ctrl_c()).await?;
            emit(cli.format, &report, render_probe)?;
        }
        Command::Best {
            symbol,
            years_ago,
            allow_static_fallback,
        } => {
            let request =
                QuoteRequest::new(symbol, years_ago).allow_static_fallback(allow_static_fallback);
            let quote = oracle.quote(request).await?;
            emit(cli.format, &quote, render_quote)?;
        }
        Command::History { symbol, date } => {
            let result = oracle.resolve_historical(&symbol, date).await?;
            emit(cli.format, &result, render_history)?;
        }
        Command::Sources { symbol } => {
            let filter = symbol.as_deref().map(AssetSymbol::parse).transpose()?;
            let listings: Vec<SourceListing> = oracle
                .registry()
                .listings()
                .into_iter()
                .filter(|l| filter.as_ref().map_or(true, |s| &l.symbol == s))
                .collect();
            if let Some(symbol) = &filter {
                if listings.is_empty() {
                    anyhow::bail!("unsupported symbol: {}", symbol);
                }
            }
            emit(cli.format, listings.as_slice(), render_listings)?;
        }
        #[cfg(feature = "server")]
        Command::Serve => {
            tracing::info!("🚀 Starting price oracle ({})", config);
            price_oracle::server::start_server(std::sync::Arc::new(oracle), &config.bind_addr()).await?;
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T, text: fn(&T) -> String) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => text(value),
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).context("Failed to serialize YAML output")?
        }
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn render_probe(report: &ProbeReport) -> String {
    let mut out = format!("📊 {} via {}\n", report.symbol, proxy_text(&report.proxy));
    for outcome in &report.outcomes {
        match &outcome.sample {
            Some(sample) => out.push_str(&format!(
                "  ✅ {:<12} {:>14.4}  {}ms\n",
                outcome.source, sample.price, sample.latency_ms
            )),
            None => out.push_str(&format!(
                "  ❌ {:<12} {}: {}\n",
                outcome.source,
                outcome.class,
                outcome.error_message.as_deref().unwrap_or("")
            )),
        }
    }

    let s = &report.summary;
    out.push_str(&format!(
        "  total={} ok={} timeout={} error={} cors={}",
        s.total, s.success_count, s.timeout_count, s.error_count, s.cors_count
    ));
    if let (Some(avg), Some(median)) = (s.average_price, s.median_price) {
        out.push_str(&format!(" avg={:.4} median={:.4}", avg, median));
    }
    if let Some(spread) = s.spread() {
        out.push_str(&format!(" spread={:.3}%", spread * 100.0));
    }
    if report.cancelled {
        out.push_str("\n  ⚠️ cancelled before every source settled");
    }
    out
}

fn render_quote(quote: &PriceQuote) -> String {
    let mut out = format!(
        "{}  now {:.4} ({})  {} {:.4} ({})",
        quote.symbol,
        quote.current_price,
        quote.source,
        quote.history_date,
        quote.history_price,
        quote.history_source
    );
    if quote.static_fallback {
        out.push_str("  [static table]");
    }
    out
}

fn render_history(result: &HistoricalResult) -> String {
    format!("{} {:.4} ({})", result.date, result.price, result.source)
}

fn render_listings(listings: &[SourceListing]) -> String {
    listings
        .iter()
        .map(|l| {
            format!(
                "{:<5} {:<12} live=[{}] historical={}",
                l.symbol.as_str(),
                l.class.to_string(),
                l.live_sources.join(", "),
                l.historical_source.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn proxy_text(proxy: &Option<String>) -> &str {
    proxy.as_deref().unwrap_or("direct connection")
}
