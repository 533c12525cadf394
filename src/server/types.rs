//! HTTP response and query types

use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// JSON envelope for every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// One line per failed source
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_log: Vec<String>,
    /// Effective outbound proxy of the failed request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_log: Vec::new(),
            proxy: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            error_log: Vec::new(),
            proxy: None,
        }
    }

    pub fn from_oracle_error(err: &OracleError) -> Self {
        Self {
            error_log: err.failure_log(),
            proxy: err.proxy().map(str::to_string),
            ..Self::error(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: String,
}

/// GET /api/price parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub symbol: String,
    #[serde(default)]
    pub years_ago: Option<u32>,
    #[serde(default)]
    pub allow_static_fallback: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub symbol: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub symbols: usize,
}
