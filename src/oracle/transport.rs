//! Outbound HTTP transport and proxy resolution
//!
//! Proxy settings are read from the environment into a [`ProxyConfig`] value
//! once per request and handed to the transport explicitly.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Proxy variables in priority order; the first non-empty one wins.
pub const PROXY_ENV_VARS: [&str; 4] = ["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY"];

/// Snapshot of the proxy environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    url: Option<String>,
}

impl ProxyConfig {
    pub fn direct() -> Self {
        Self { url: None }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }

    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = PROXY_ENV_VARS.iter().find_map(|name| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        });
        Self { url }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_direct(&self) -> bool {
        self.url.is_none()
    }
}

/// Raw HTTP response (status + body text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("{0}")]
    Network(String),
}

/// Outbound GET with a per-call deadline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError>;

    /// Effective proxy URL, `None` when connecting directly.
    fn proxy_url(&self) -> Option<String>;
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Build error text when no client could be constructed
    client: Result<reqwest::Client, String>,
    proxy: Option<String>,
}

impl ReqwestTransport {
    /// Build a transport for the given proxy snapshot.
    ///
    /// A malformed proxy URL is logged and the transport connects directly
    /// instead of failing the request.
    pub fn new(proxy: &ProxyConfig, user_agent: &str) -> Self {
        if let Some(url) = proxy.url() {
            match Self::build_client(Some(url), user_agent) {
                Ok(client) => {
                    tracing::debug!(proxy = %url, "Routing price requests through proxy");
                    return Self {
                        client: Ok(client),
                        proxy: Some(url.to_string()),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        proxy = %url,
                        error = %e,
                        "Invalid proxy configuration, falling back to direct connection"
                    );
                }
            }
        }

        let client = Self::build_client(None, user_agent).map_err(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client");
            e.to_string()
        });
        Self {
            client,
            proxy: None,
        }
    }

    /// Resolve the proxy from the current environment and build a transport.
    pub fn from_env(user_agent: &str) -> Self {
        Self::new(&ProxyConfig::from_env(), user_agent)
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }

    fn build_client(proxy: Option<&str>, user_agent: &str) -> reqwest::Result<reqwest::Client> {
        let builder = reqwest::Client::builder().user_agent(user_agent);
        let builder = match proxy {
            Some(url) => builder.proxy(reqwest::Proxy::all(url)?),
            // reqwest would otherwise pick up proxy variables on its own
            None => builder.no_proxy(),
        };
        builder.build()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let client = self
            .client
            .as_ref()
            .map_err(|e| TransportError::Network(format!("HTTP client unavailable: {e}")))?;
        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout))?;

        Ok(HttpResponse { status, body })
    }

    fn proxy_url(&self) -> Option<String> {
        self.proxy.clone()
    }
}

fn classify_reqwest_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_connect() {
        TransportError::Network(format!("connection failed: {error}"))
    } else {
        TransportError::Network(format!("request failed: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_proxy_variables_means_direct() {
        let config = ProxyConfig::from_lookup(lookup(&[]));
        assert!(config.is_direct());
    }

    #[test]
    fn first_non_empty_variable_wins() {
        let config = ProxyConfig::from_lookup(lookup(&[
            ("https_proxy", "   "),
            ("HTTPS_PROXY", ""),
            ("http_proxy", "http://lower.proxy:8080"),
            ("HTTP_PROXY", "http://upper.proxy:8080"),
        ]));
        assert_eq!(config.url(), Some("http://lower.proxy:8080"));
    }

    #[test]
    fn lowercase_https_takes_priority() {
        let config = ProxyConfig::from_lookup(lookup(&[
            ("https_proxy", "http://a:1"),
            ("HTTP_PROXY", "http://b:2"),
        ]));
        assert_eq!(config.url(), Some("http://a:1"));
    }

    #[test]
    fn transport_uses_proxy_only_when_configured() {
        let direct = ReqwestTransport::new(&ProxyConfig::direct(), "test-agent");
        assert!(!direct.is_proxied());
        assert_eq!(direct.proxy_url(), None);

        let proxied = ReqwestTransport::new(
            &ProxyConfig::with_url("http://127.0.0.1:3128"),
            "test-agent",
        );
        assert!(proxied.is_proxied());
        assert_eq!(proxied.proxy_url().as_deref(), Some("http://127.0.0.1:3128"));
    }

    #[test]
    fn malformed_proxy_falls_back_to_direct() {
        let transport =
            ReqwestTransport::new(&ProxyConfig::with_url("ftp://proxy.local:21"), "test-agent");
        assert!(!transport.is_proxied());
    }

    #[tokio::test]
    async fn unbuildable_client_fails_through_get() {
        let transport = ReqwestTransport {
            client: Err("no TLS backend".to_string()),
            proxy: None,
        };
        let err = transport
            .get("https://api.binance.com", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Network("HTTP client unavailable: no TLS backend".to_string())
        );
    }

    #[test]
    fn response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(451, "").is_success());
    }
}
