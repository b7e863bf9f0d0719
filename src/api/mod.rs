//! # api: Backend Fetch Capability
//!
//! [`BackendApi`] is the seam between the core and the REST backend. The sync
//! loop and the action gateway only ever see this trait; [`HttpBackend`] is
//! the production implementation, tests inject their own.
//!
//! | Method | Path                  | Call                          |
//! |--------|-----------------------|-------------------------------|
//! | GET    | `/orderbook`          | [`BackendApi::orderbook`]     |
//! | POST   | `/orders`             | [`BackendApi::place_order`]   |
//! | DELETE | `/orders/{id}`        | [`BackendApi::cancel_order`]  |
//! | GET    | `/trades/{trader}`    | [`BackendApi::trades`]        |
//! | GET    | `/pool`               | [`BackendApi::pool`]          |
//! | POST   | `/pool/supply`        | [`BackendApi::supply`]        |
//! | POST   | `/pool/borrow`        | [`BackendApi::borrow`]        |
//! | POST   | `/pool/repay`         | [`BackendApi::repay`]         |
//! | GET    | `/positions/{trader}` | [`BackendApi::positions`]     |
//! | GET    | `/oracle`             | [`BackendApi::oracle`]        |

use async_trait::async_trait;
use serde::Serialize;

use crate::error::NetworkError;
use crate::models::{OrderbookResponse, PoolSnapshot, Position, PriceQuote, Side, Trade};

pub mod http;

pub use http::HttpBackend;

// ─── Request Bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceOrderRequest {
    pub trader:   String,
    pub side:     Side,
    pub price:    f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyRequest {
    pub trader: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorrowRequest {
    pub trader:     String,
    pub collateral: f64,
    pub amount:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepayRequest {
    pub trader:      String,
    pub position_id: String,
    pub amount:      f64,
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Every backend call the dashboard makes. Reads return already-normalized
/// domain types; writes return the backend's acknowledgement body verbatim.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn orderbook(&self) -> Result<OrderbookResponse, NetworkError>;

    async fn place_order(&self, req: &PlaceOrderRequest) -> Result<serde_json::Value, NetworkError>;

    /// `trader` is sent as a query parameter when known.
    async fn cancel_order(&self, order_id: &str, trader: Option<&str>) -> Result<serde_json::Value, NetworkError>;

    async fn trades(&self, trader: &str) -> Result<Vec<Trade>, NetworkError>;

    async fn pool(&self) -> Result<PoolSnapshot, NetworkError>;

    async fn supply(&self, req: &SupplyRequest) -> Result<serde_json::Value, NetworkError>;

    async fn borrow(&self, req: &BorrowRequest) -> Result<serde_json::Value, NetworkError>;

    async fn repay(&self, req: &RepayRequest) -> Result<serde_json::Value, NetworkError>;

    async fn positions(&self, trader: &str) -> Result<Vec<Position>, NetworkError>;

    async fn oracle(&self) -> Result<PriceQuote, NetworkError>;
}
