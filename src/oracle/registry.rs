//! Source registry
//!
//! Static table from asset symbol to the providers able to price it. Live
//! sources are kept in fallback priority order (first = preferred).

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::OracleError;
use crate::oracle::sources::{
    BinanceKlines, BinanceTicker, CoinCapAsset, CoinCapHistory, CoinGeckoHistory,
    CoinGeckoSimple, CoinPaprikaTicker, HistoricalSource, OkxTicker, PriceSource,
};
use crate::types::{AssetClass, AssetSymbol};

/// Provider used for historical lookups of crypto assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoricalProvider {
    #[default]
    Binance,
    CoinGecko,
    CoinCap,
}

impl FromStr for HistoricalProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "coingecko" => Ok(Self::CoinGecko),
            "coincap" => Ok(Self::CoinCap),
            other => Err(format!(
                "unknown historical source '{other}' (expected binance, coingecko or coincap)"
            )),
        }
    }
}

impl fmt::Display for HistoricalProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
            Self::CoinGecko => write!(f, "coingecko"),
            Self::CoinCap => write!(f, "coincap"),
        }
    }
}

/// Provider identifiers for one crypto asset. `None` = not listed there.
struct CryptoListing {
    symbol: &'static str,
    binance: Option<&'static str>,
    okx: Option<&'static str>,
    coinpaprika: Option<&'static str>,
    coingecko: Option<&'static str>,
    coincap: Option<&'static str>,
}

const CRYPTO_LISTINGS: &[CryptoListing] = &[
    CryptoListing {
        symbol: "BTC",
        binance: Some("BTCUSDT"),
        okx: Some("BTC-USDT"),
        coinpaprika: Some("btc-bitcoin"),
        coingecko: Some("bitcoin"),
        coincap: Some("bitcoin"),
    },
    CryptoListing {
        symbol: "ETH",
        binance: Some("ETHUSDT"),
        okx: Some("ETH-USDT"),
        coinpaprika: Some("eth-ethereum"),
        coingecko: Some("ethereum"),
        coincap: Some("ethereum"),
    },
    CryptoListing {
        symbol: "SOL",
        binance: Some("SOLUSDT"),
        okx: Some("SOL-USDT"),
        coinpaprika: Some("sol-solana"),
        coingecko: Some("solana"),
        coincap: Some("solana"),
    },
    CryptoListing {
        symbol: "XRP",
        binance: Some("XRPUSDT"),
        okx: Some("XRP-USDT"),
        coinpaprika: Some("xrp-xrp"),
        coingecko: Some("ripple"),
        coincap: Some("xrp"),
    },
    CryptoListing {
        symbol: "BNB",
        binance: Some("BNBUSDT"),
        okx: Some("BNB-USDT"),
        coinpaprika: Some("bnb-binance-coin"),
        coingecko: Some("binancecoin"),
        coincap: Some("binance-coin"),
    },
    CryptoListing {
        symbol: "DOGE",
        binance: Some("DOGEUSDT"),
        okx: Some("DOGE-USDT"),
        coinpaprika: Some("doge-dogecoin"),
        coingecko: Some("dogecoin"),
        coincap: Some("dogecoin"),
    },
    CryptoListing {
        symbol: "ADA",
        binance: Some("ADAUSDT"),
        okx: Some("ADA-USDT"),
        coinpaprika: Some("ada-cardano"),
        coingecko: Some("cardano"),
        coincap: Some("cardano"),
    },
];

/// Symbols with no live API; only the static fallback table can price them.
const EQUITY_PROXIES: &[&str] = &["QQQ"];

/// Everything the oracle knows about one symbol
#[derive(Clone)]
pub struct RegistryEntry {
    pub class: AssetClass,
    pub live: Vec<Arc<dyn PriceSource>>,
    pub historical: Option<Arc<dyn HistoricalSource>>,
}

impl RegistryEntry {
    pub fn new(class: AssetClass) -> Self {
        Self {
            class,
            live: Vec::new(),
            historical: None,
        }
    }

    pub fn with_live(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.live.push(source);
        self
    }

    pub fn with_historical(mut self, source: Arc<dyn HistoricalSource>) -> Self {
        self.historical = Some(source);
        self
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("class", &self.class)
            .field(
                "live",
                &self.live.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("historical", &self.historical.as_ref().map(|s| s.name()))
            .finish()
    }
}

/// Serializable registry row for listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceListing {
    pub symbol: AssetSymbol,
    pub class: AssetClass,
    pub live_sources: Vec<String>,
    pub historical_source: Option<String>,
}

/// Read-only symbol -> sources table
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: BTreeMap<AssetSymbol, RegistryEntry>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in table: every listed crypto asset with all of its live
    /// providers, plus the equity proxies.
    pub fn with_defaults(historical: HistoricalProvider) -> Self {
        let mut registry = Self::empty();

        for listing in CRYPTO_LISTINGS {
            let mut entry = RegistryEntry::new(AssetClass::Crypto);
            if let Some(pair) = listing.binance {
                entry = entry.with_live(Arc::new(BinanceTicker::new(pair)));
            }
            if let Some(inst_id) = listing.okx {
                entry = entry.with_live(Arc::new(OkxTicker::new(inst_id)));
            }
            if let Some(id) = listing.coinpaprika {
                entry = entry.with_live(Arc::new(CoinPaprikaTicker::new(id)));
            }
            if let Some(id) = listing.coingecko {
                entry = entry.with_live(Arc::new(CoinGeckoSimple::new(id)));
            }
            if let Some(id) = listing.coincap {
                entry = entry.with_live(Arc::new(CoinCapAsset::new(id)));
            }

            let history: Option<Arc<dyn HistoricalSource>> = match historical {
                HistoricalProvider::Binance => listing
                    .binance
                    .map(|pair| Arc::new(BinanceKlines::new(pair)) as Arc<dyn HistoricalSource>),
                HistoricalProvider::CoinGecko => listing
                    .coingecko
                    .map(|id| Arc::new(CoinGeckoHistory::new(id)) as Arc<dyn HistoricalSource>),
                HistoricalProvider::CoinCap => listing
                    .coincap
                    .map(|id| Arc::new(CoinCapHistory::new(id)) as Arc<dyn HistoricalSource>),
            };
            if let Some(source) = history {
                entry = entry.with_historical(source);
            }

            registry.register(listing.symbol, entry);
        }

        for symbol in EQUITY_PROXIES {
            registry.register(symbol, RegistryEntry::new(AssetClass::EquityProxy));
        }

        registry
    }

    /// Add or replace an entry. Symbols that fail normalization are ignored.
    pub fn register(&mut self, symbol: &str, entry: RegistryEntry) {
        match AssetSymbol::parse(symbol) {
            Ok(symbol) => {
                self.entries.insert(symbol, entry);
            }
            Err(e) => tracing::warn!(symbol = %symbol, error = %e, "Skipping registry entry"),
        }
    }

    pub fn entry(&self, symbol: &AssetSymbol) -> Option<&RegistryEntry> {
        self.entries.get(symbol)
    }

    /// Live sources in priority order.
    ///
    /// An unknown symbol, or one with no live source, is an unsupported asset.
    pub fn sources_for(
        &self,
        symbol: &AssetSymbol,
    ) -> Result<&[Arc<dyn PriceSource>], OracleError> {
        match self.entries.get(symbol) {
            Some(entry) if !entry.live.is_empty() => Ok(&entry.live),
            _ => Err(OracleError::UnsupportedSymbol(symbol.to_string())),
        }
    }

    pub fn historical_source_for(
        &self,
        symbol: &AssetSymbol,
    ) -> Result<&Arc<dyn HistoricalSource>, OracleError> {
        let entry = self
            .entries
            .get(symbol)
            .ok_or_else(|| OracleError::UnsupportedSymbol(symbol.to_string()))?;
        entry
            .historical
            .as_ref()
            .ok_or_else(|| OracleError::NoHistoricalSource(symbol.to_string()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &AssetSymbol> {
        self.entries.keys()
    }

    pub fn listings(&self) -> Vec<SourceListing> {
        self.entries
            .iter()
            .map(|(symbol, entry)| SourceListing {
                symbol: symbol.clone(),
                class: entry.class,
                live_sources: entry.live.iter().map(|s| s.name().to_string()).collect(),
                historical_source: entry.historical.as_ref().map(|s| s.name().to_string()),
            })
            .collect()
    }
}
