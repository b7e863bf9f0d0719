//! # api::http
//!
//! **HttpBackend**: [`BackendApi`] over the backend's JSON REST API using a
//! shared `reqwest::Client`.
//!
//! Every request carries the configured timeout; the core itself imposes no
//! other deadline. Non-2xx responses become [`NetworkError::Status`] with the
//! response body attached for the logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{BackendApi, BorrowRequest, PlaceOrderRequest, RepayRequest, SupplyRequest};
use crate::config::Config;
use crate::error::NetworkError;
use crate::models::{
    OracleResponse, OrderbookResponse, PoolResponse, PoolSnapshot, Position, PriceQuote, Trade,
};

// ─── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client:   reqwest::Client,
    base_url: Url,
    timeout:  Duration,
}

impl HttpBackend {
    /// `base_url` must be a base URL (http/https), e.g. `http://host:8080/api`.
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    /// Reuse an existing client (connection pool shared with other callers).
    pub fn with_client(client: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self { client, base_url, timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    /// Send and return the raw body of a 2xx response.
    async fn execute(&self, request: RequestBuilder, endpoint: &str) -> Result<String, NetworkError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                debug!(endpoint, error = %e, "Backend unreachable");
                NetworkError::Unreachable {
                    endpoint: endpoint.to_string(),
                    message:  e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| NetworkError::Decode {
            endpoint: endpoint.to_string(),
            message:  e.to_string(),
        })?;

        if !status.is_success() {
            return Err(NetworkError::Status {
                endpoint: endpoint.to_string(),
                status:   status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, NetworkError> {
        let endpoint = format!("GET {}", url.path());
        let body = self.execute(self.client.get(url), &endpoint).await?;

        serde_json::from_str(&body).map_err(|e| NetworkError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }

    /// Mutating call. An empty acknowledgement decodes as `null`, a non-JSON
    /// one is kept as a string.
    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<serde_json::Value, NetworkError> {
        let endpoint = format!("{method} {}", url.path());
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let raw = self.execute(request, &endpoint).await.map_err(|e| {
            debug!(endpoint = %endpoint, error = %e, "Backend rejected action");
            e
        })?;

        if raw.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw)))
    }
}

// ─── BackendApi ───────────────────────────────────────────────────────────────

#[async_trait]
impl BackendApi for HttpBackend {
    async fn orderbook(&self) -> Result<OrderbookResponse, NetworkError> {
        self.get_json(self.endpoint(&["orderbook"])).await
    }

    async fn place_order(&self, req: &PlaceOrderRequest) -> Result<serde_json::Value, NetworkError> {
        self.send_json(Method::POST, self.endpoint(&["orders"]), Some(req)).await
    }

    async fn cancel_order(&self, order_id: &str, trader: Option<&str>) -> Result<serde_json::Value, NetworkError> {
        let mut url = self.endpoint(&["orders", order_id]);
        if let Some(trader) = trader {
            url.query_pairs_mut().append_pair("trader", trader);
        }
        self.send_json::<()>(Method::DELETE, url, None).await
    }

    async fn trades(&self, trader: &str) -> Result<Vec<Trade>, NetworkError> {
        self.get_json(self.endpoint(&["trades", trader])).await
    }

    async fn pool(&self) -> Result<PoolSnapshot, NetworkError> {
        let raw: PoolResponse = self.get_json(self.endpoint(&["pool"])).await?;
        Ok(raw.into())
    }

    async fn supply(&self, req: &SupplyRequest) -> Result<serde_json::Value, NetworkError> {
        self.send_json(Method::POST, self.endpoint(&["pool", "supply"]), Some(req)).await
    }

    async fn borrow(&self, req: &BorrowRequest) -> Result<serde_json::Value, NetworkError> {
        self.send_json(Method::POST, self.endpoint(&["pool", "borrow"]), Some(req)).await
    }

    async fn repay(&self, req: &RepayRequest) -> Result<serde_json::Value, NetworkError> {
        self.send_json(Method::POST, self.endpoint(&["pool", "repay"]), Some(req)).await
    }

    async fn positions(&self, trader: &str) -> Result<Vec<Position>, NetworkError> {
        let url = self.endpoint(&["positions", trader]);
        let endpoint = format!("GET {}", url.path());
        let raw: serde_json::Value = self.get_json(url).await?;
        Position::list_from_value(raw).map_err(|e| NetworkError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }

    async fn oracle(&self) -> Result<PriceQuote, NetworkError> {
        let raw: OracleResponse = self.get_json(self.endpoint(&["oracle"])).await?;
        Ok(raw.into())
    }
}
