//! Oracle HTTP API
//!
//! REST endpoints over [`PriceOracle`].

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::types::*;
use crate::error::OracleError;
use crate::oracle::{HistoricalResult, PriceOracle, QuoteRequest};

type AppState = Arc<PriceOracle>;

/// Create the API router with all endpoints
pub fn create_router(oracle: Arc<PriceOracle>) -> Router {
    Router::new()
        .route("/api/probe", get(get_probe))
        .route("/api/price", get(get_price))
        .route("/api/history", get(get_history))
        .route("/api/sources", get(get_sources))
        .route("/api/health", get(get_health))
        .with_state(oracle)
        // Browser clients call from arbitrary origins
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn respond<T: Serialize>(result: Result<T, OracleError>) -> (StatusCode, Json<ApiResponse<T>>) {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            tracing::warn!(status = %status, error = %e, "API request failed");
            (status, Json(ApiResponse::from_oracle_error(&e)))
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────

/// GET /api/probe?symbol=BTC - Query every source, report all outcomes
async fn get_probe(
    Query(query): Query<SymbolQuery>,
    State(oracle): State<AppState>,
) -> impl IntoResponse {
    respond(oracle.probe_all(&query.symbol).await)
}

/// GET /api/price?symbol=BTC&yearsAgo=1&allowStaticFallback=false
async fn get_price(
    Query(query): Query<PriceQuery>,
    State(oracle): State<AppState>,
) -> impl IntoResponse {
    let request = QuoteRequest::new(query.symbol, query.years_ago.unwrap_or(1))
        .allow_static_fallback(query.allow_static_fallback.unwrap_or(false));
    respond(oracle.quote(request).await)
}

/// GET /api/history?symbol=BTC&date=2024-01-01
async fn get_history(
    Query(query): Query<HistoryQuery>,
    State(oracle): State<AppState>,
) -> impl IntoResponse {
    let date = match NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d") {
        Ok(date) => date,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<HistoricalResult>::error(format!(
                    "invalid date '{}' (expected YYYY-MM-DD): {}",
                    query.date, e
                ))),
            );
        }
    };
    respond(oracle.resolve_historical(&query.symbol, date).await)
}

/// GET /api/sources - Registry listing
async fn get_sources(State(oracle): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(oracle.registry().listings()))
}

/// GET /api/health
async fn get_health(State(oracle): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        symbols: oracle.registry().symbols().count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::sources::{BinanceKlines, BinanceTicker};
    use crate::oracle::transport::{HttpResponse, MockHttpTransport, TransportError};
    use crate::oracle::{OracleSettings, RegistryEntry, SourceRegistry};
    use crate::types::AssetClass;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn registry() -> SourceRegistry {
        let mut registry = SourceRegistry::empty();
        registry.register(
            "BTC",
            RegistryEntry::new(AssetClass::Crypto)
                .with_live(Arc::new(BinanceTicker::new("BTCUSDT")))
                .with_historical(Arc::new(BinanceKlines::new("BTCUSDT"))),
        );
        registry.register("QQQ", RegistryEntry::new(AssetClass::EquityProxy));
        registry
    }

    fn router(transport: MockHttpTransport) -> Router {
        let oracle = PriceOracle::with_transport(
            registry(),
            OracleSettings::default(),
            Arc::new(transport),
        );
        create_router(Arc::new(oracle))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_symbol_count() {
        let (status, body) = call(router(MockHttpTransport::new()), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["symbols"], 2);
    }

    #[tokio::test]
    async fn probe_returns_outcomes_and_summary() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_, _| Ok(HttpResponse::ok_json(r#"{"price":"65000.50"}"#)));
        transport.expect_proxy_url().returning(|| None);

        let (status, body) = call(router(transport), "/api/probe?symbol=btc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["symbol"], "BTC");
        assert_eq!(body["data"]["summary"]["successCount"], 1);
        assert_eq!(body["data"]["outcomes"][0]["class"], "success");
    }

    #[tokio::test]
    async fn unknown_symbol_is_bad_request() {
        let (status, body) = call(router(MockHttpTransport::new()), "/api/probe?symbol=NOPE").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("NOPE"));
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway_with_error_log() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Err(TransportError::Network("connection refused".to_string())));
        transport
            .expect_proxy_url()
            .returning(|| Some("http://proxy.local:3128".to_string()));

        let (status, body) = call(router(transport), "/api/price?symbol=BTC&yearsAgo=1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["errorLog"].as_array().unwrap().len(), 1);
        assert_eq!(body["proxy"], "http://proxy.local:3128");
    }

    #[tokio::test]
    async fn equity_proxy_needs_static_fallback_flag() {
        let (status, _) = call(router(MockHttpTransport::new()), "/api/price?symbol=QQQ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            router(MockHttpTransport::new()),
            "/api/price?symbol=QQQ&yearsAgo=5&allowStaticFallback=true",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["staticFallback"], true);
        assert_eq!(body["data"]["currentPrice"], 511.23);
    }

    #[tokio::test]
    async fn malformed_history_date_is_bad_request() {
        let (status, body) = call(
            router(MockHttpTransport::new()),
            "/api/history?symbol=BTC&date=01/01/2024",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn sources_lists_registry() {
        let (status, body) = call(router(MockHttpTransport::new()), "/api/sources").await;
        assert_eq!(status, StatusCode::OK);
        let listings = body["data"].as_array().unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0]["liveSources"][0], "Binance");
    }
}
