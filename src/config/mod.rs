//! Configuration management for the price oracle
//!
//! Loads from YAML files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::oracle::{HistoricalProvider, OracleSettings, RetryPolicy};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub oracle: OracleConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Per-source deadline for the diagnostic probe
    pub probe_timeout_ms: u64,
    /// Per-source deadline for the ordered resolver
    pub live_timeout_ms: u64,
    /// Per-attempt deadline for historical lookups
    pub historical_timeout_ms: u64,
    pub historical_max_attempts: u32,
    /// Wait before each historical attempt (first entry = before attempt 1)
    pub historical_retry_delays_ms: Vec<u64>,
    /// binance | coingecko | coincap
    pub historical_source: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PRICE_ORACLE__*)
            .add_source(
                Environment::with_prefix("PRICE_ORACLE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("oracle.historical_retry_delays_ms")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        Self::from_config(config)
    }

    /// Built-in defaults only (no files, no environment).
    pub fn builtin() -> Result<Self> {
        let config = Self::defaults()?
            .build()
            .context("Failed to build configuration")?;
        Self::from_config(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            // Oracle defaults
            .set_default("oracle.probe_timeout_ms", 8_000)?
            .set_default("oracle.live_timeout_ms", 5_000)?
            .set_default("oracle.historical_timeout_ms", 15_000)?
            .set_default("oracle.historical_max_attempts", 3)?
            .set_default("oracle.historical_retry_delays_ms", vec![0, 2_000, 4_000])?
            .set_default("oracle.historical_source", "binance")?
            .set_default(
                "oracle.user_agent",
                concat!("price-oracle/", env!("CARGO_PKG_VERSION")),
            )?
            // Server defaults
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8787)?
            // Logging defaults
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    fn from_config(config: Config) -> Result<Self> {
        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject settings the oracle cannot run with
    pub fn validate(&self) -> Result<()> {
        let oracle = &self.oracle;
        for (key, value) in [
            ("oracle.probe_timeout_ms", oracle.probe_timeout_ms),
            ("oracle.live_timeout_ms", oracle.live_timeout_ms),
            ("oracle.historical_timeout_ms", oracle.historical_timeout_ms),
        ] {
            if value == 0 {
                bail!("{} must be greater than zero", key);
            }
        }
        if oracle.historical_max_attempts == 0 {
            bail!("oracle.historical_max_attempts must be at least 1");
        }
        self.historical_provider()?;
        Ok(())
    }

    pub fn historical_provider(&self) -> Result<HistoricalProvider> {
        self.oracle
            .historical_source
            .parse::<HistoricalProvider>()
            .map_err(anyhow::Error::msg)
            .context("Invalid oracle.historical_source")
    }

    /// Deadlines and retry schedule for [`crate::oracle::PriceOracle`]
    pub fn oracle_settings(&self) -> OracleSettings {
        let oracle = &self.oracle;
        OracleSettings {
            probe_timeout: Duration::from_millis(oracle.probe_timeout_ms),
            live_timeout: Duration::from_millis(oracle.live_timeout_ms),
            historical_timeout: Duration::from_millis(oracle.historical_timeout_ms),
            historical_retry: RetryPolicy::from_millis(
                oracle.historical_max_attempts,
                &oracle.historical_retry_delays_ms,
            ),
            user_agent: oracle.user_agent.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "historical={} probe={}ms live={}ms history={}ms x{} delays={:?} server={}",
            self.oracle.historical_source,
            self.oracle.probe_timeout_ms,
            self.oracle.live_timeout_ms,
            self.oracle.historical_timeout_ms,
            self.oracle.historical_max_attempts,
            self.oracle.historical_retry_delays_ms,
            self.bind_addr()
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
