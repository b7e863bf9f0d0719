//! In-process mock of the Umbra REST backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{json, Value};

use umbra_dashboard::api::HttpBackend;
use umbra_dashboard::Config;

#[derive(Clone, Default)]
pub struct Mock {
    log:    Arc<Mutex<Vec<String>>>,
    orders: Arc<Mutex<Vec<Value>>>,
    down:   Arc<AtomicBool>,
}

impl Mock {
    fn record(&self, line: String) {
        self.log.lock().unwrap().push(line);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// From now on every lending read answers 500.
    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn unavailable(&self) -> Option<Response> {
        self.down
            .load(Ordering::SeqCst)
            .then(|| (StatusCode::INTERNAL_SERVER_ERROR, "ledger unavailable").into_response())
    }

    pub fn saw(&self, prefix: &str) -> bool {
        self.log().iter().any(|l| l.starts_with(prefix))
    }
}

pub struct Server {
    pub mock:     Mock,
    pub base_url: Url,
}

impl Server {
    pub fn backend(&self) -> HttpBackend {
        HttpBackend::new(self.base_url.clone(), Duration::from_secs(2))
    }

    pub fn config(&self, trader: Option<&str>) -> Config {
        let url = self.base_url.to_string();
        let trader = trader.map(str::to_string);
        Config::from_lookup(move |key| match key {
            "UMBRA_API_URL" => Some(url.clone()),
            "UMBRA_TRADER" => trader.clone(),
            // long enough that only refresh_now drives the tests
            "TRADE_POLL_MS" | "LEND_POLL_MS" => Some("60000".into()),
            _ => None,
        })
        .unwrap()
    }
}

pub async fn spawn() -> Server {
    let mock = Mock::default();
    let app = Router::new()
        .route("/api/orderbook", get(orderbook))
        .route("/api/orders", post(place_order))
        .route("/api/orders/:id", delete(cancel_order))
        .route("/api/trades/:trader", get(trades))
        .route("/api/pool", get(pool))
        .route("/api/pool/supply", post(supply))
        .route("/api/pool/borrow", post(borrow))
        .route("/api/pool/repay", post(repay))
        .route("/api/positions/:trader", get(positions))
        .route("/api/oracle", get(oracle))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        mock,
        base_url: Url::parse(&format!("http://{addr}/api")).unwrap(),
    }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn orderbook(State(m): State<Mock>) -> Json<Value> {
    m.record("GET /orderbook".into());
    let orders = m.orders.lock().unwrap().clone();
    Json(json!({
        "bids": [{ "price": 100.0, "quantity": 5.0 }, { "price": 99.0, "quantity": 3.0 }],
        "asks": [{ "price": 101.0, "quantity": 2.0 }],
        "orders": orders,
    }))
}

async fn place_order(State(m): State<Mock>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    m.record(format!("POST /orders {body}"));
    let mut orders = m.orders.lock().unwrap();
    let order = json!({
        "id":       format!("o-{}", orders.len() + 1),
        "side":     body["side"],
        "price":    body["price"],
        "quantity": body["quantity"],
        "trader":   body["trader"],
    });
    orders.push(order.clone());
    (StatusCode::CREATED, Json(order))
}

async fn cancel_order(
    State(m): State<Mock>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> StatusCode {
    m.record(format!("DELETE /orders/{id} trader={}", q.get("trader").cloned().unwrap_or_default()));
    m.orders.lock().unwrap().retain(|o| o["id"] != id.as_str());
    StatusCode::NO_CONTENT
}

async fn trades(State(m): State<Mock>, Path(trader): Path<String>) -> Json<Value> {
    m.record(format!("GET /trades/{trader}"));
    Json(json!([
        { "price": 101.0, "quantity": 1.0, "timestamp": "2025-01-01T00:00:03Z", "side": "buy" },
        { "price": 100.5, "quantity": 2.0, "timestamp": "2025-01-01T00:00:02Z", "side": "sell" },
        { "price": 100.0, "quantity": 1.5 },
    ]))
}

async fn pool(State(m): State<Mock>) -> Response {
    m.record("GET /pool".into());
    if let Some(down) = m.unavailable() {
        return down;
    }
    Json(json!({ "totalSupply": 1000.0, "totalBorrows": 250.0, "supplyApy": 0.03, "borrowApy": 0.05 })).into_response()
}

async fn supply(State(m): State<Mock>, Json(body): Json<Value>) -> Json<Value> {
    m.record(format!("POST /pool/supply {body}"));
    Json(json!({ "status": "ok" }))
}

async fn borrow(State(m): State<Mock>, Json(body): Json<Value>) -> Response {
    m.record(format!("POST /pool/borrow {body}"));
    if body["amount"].as_f64().unwrap_or(0.0) > 1_000.0 {
        return (StatusCode::BAD_REQUEST, "insufficient collateral").into_response();
    }
    Json(json!({ "status": "ok" })).into_response()
}

async fn repay(State(m): State<Mock>, Json(body): Json<Value>) -> &'static str {
    m.record(format!("POST /pool/repay {body}"));
    "repaid"
}

async fn positions(State(m): State<Mock>, Path(trader): Path<String>) -> Response {
    m.record(format!("GET /positions/{trader}"));
    if let Some(down) = m.unavailable() {
        return down;
    }
    match trader.as_str() {
        "alice" => {}
        "broken" => return Json(json!([{ "id": "x", "amount": 1.0 }])).into_response(),
        _ => return Json(json!({ "error": "unknown trader" })).into_response(),
    }
    Json(json!([
        { "id": "s1", "type": "supply", "amount": 500.0 },
        { "id": "b1", "type": "borrow", "amount": 0.0, "collateral": 10.0, "healthFactor": "Infinity" },
        { "id": "b2", "type": "borrow", "amount": 100.0, "collateral": 1.0, "healthFactor": 0.8 },
    ]))
    .into_response()
}

async fn oracle(State(m): State<Mock>) -> Response {
    m.record("GET /oracle".into());
    if let Some(down) = m.unavailable() {
        return down;
    }
    Json(json!({ "ccPrice": 0.17 })).into_response()
}
