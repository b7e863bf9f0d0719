//! # gateway: ActionGateway
//!
//! Dispatches the mutating intents of both views to the backend.
//!
//! ```text
//! form ──▶ trader? ──▶ busy? ──▶ validate ──▶ BackendApi ──┬─ ok  ──▶ clear form ──▶ refresh_now
//!            │           │          │                      └─ err ──▶ event + keep form
//!            └───────────┴──────────┴── ValidationError, nothing sent
//! ```
//!
//! Failures are never retried and never roll the form back; the user sees an
//! `ACTION_FAILED` event and can resubmit the same input.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{error, info};

use crate::api::{BackendApi, BorrowRequest, PlaceOrderRequest, RepayRequest, SupplyRequest};
use crate::engine::sync::Refresh;
use crate::error::{ActionError, ActionKind, GatewayError, NetworkError, ValidationError};
use crate::events::{DashboardEvent, EventBus};
use crate::models::{Side, Trader};

// ─── Forms ────────────────────────────────────────────────────────────────────

/// Raw order entry input, as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderForm {
    pub side:     Side,
    pub price:    String,
    pub quantity: String,
}

impl Default for OrderForm {
    fn default() -> Self {
        Self { side: Side::Buy, price: String::new(), quantity: String::new() }
    }
}

impl OrderForm {
    /// The selected side survives a successful submit.
    pub fn clear(&mut self) {
        self.price.clear();
        self.quantity.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplyForm {
    pub amount: String,
}

impl SupplyForm {
    pub fn clear(&mut self) {
        self.amount.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorrowForm {
    pub collateral: String,
    pub amount:     String,
}

impl BorrowForm {
    pub fn clear(&mut self) {
        self.collateral.clear();
        self.amount.clear();
    }

    /// Lenient reading for the live preview: anything unparseable counts as 0.
    pub fn preview_inputs(&self) -> (f64, f64) {
        (lenient(&self.collateral), lenient(&self.amount))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepayForm {
    pub position_id: String,
    pub amount:      String,
}

impl RepayForm {
    pub fn clear(&mut self) {
        self.position_id.clear();
        self.amount.clear();
    }
}

// ─── Validation ───────────────────────────────────────────────────────────────

fn required<'a>(field: &'static str, raw: &'a str) -> Result<&'a str, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(value)
}

fn number(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    let value = required(field, raw)?;
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ValidationError::Unparseable { field, value: value.to_string() }),
    }
}

fn lenient(raw: &str) -> f64 {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0)
}

// ─── In-flight Guard ──────────────────────────────────────────────────────────

#[derive(Default)]
struct InFlight {
    pending: Mutex<HashSet<ActionKind>>,
}

impl InFlight {
    fn acquire(self: &Arc<Self>, action: ActionKind) -> Result<InFlightGuard, ValidationError> {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if !pending.insert(action) {
            return Err(ValidationError::Busy(action));
        }
        Ok(InFlightGuard { owner: Arc::clone(self), action })
    }
}

struct InFlightGuard {
    owner:  Arc<InFlight>,
    action: ActionKind,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut pending = self.owner.pending.lock().unwrap_or_else(|p| p.into_inner());
        pending.remove(&self.action);
    }
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

/// Sends user intents to the backend and refreshes the owning view on success.
///
/// One gateway per mounted view: `refresher` is that view's sync loop.
#[derive(Clone)]
pub struct ActionGateway {
    api:       Arc<dyn BackendApi>,
    trader:    Option<Trader>,
    refresher: Arc<dyn Refresh>,
    events:    EventBus,
    in_flight: Arc<InFlight>,
}

impl ActionGateway {
    pub fn new(
        api: Arc<dyn BackendApi>,
        trader: Option<Trader>,
        refresher: Arc<dyn Refresh>,
        events: EventBus,
    ) -> Self {
        Self {
            api,
            trader,
            refresher,
            events,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn trader(&self) -> Option<&str> {
        self.trader.as_deref()
    }

    /// `POST /orders`. Returns the created order as the backend sent it.
    pub async fn place(&self, form: &mut OrderForm) -> Result<Value, GatewayError> {
        let trader = self.require_trader()?;
        let _busy = self.in_flight.acquire(ActionKind::PlaceOrder)?;
        let req = PlaceOrderRequest {
            trader:   trader.to_string(),
            side:     form.side,
            price:    number("price", &form.price)?,
            quantity: number("quantity", &form.quantity)?,
        };

        let ack = self.send(ActionKind::PlaceOrder, self.api.place_order(&req)).await?;
        form.clear();
        self.refresher.refresh_now().await;
        Ok(ack)
    }

    /// `DELETE /orders/{id}?trader=…`
    pub async fn cancel(&self, order_id: &str) -> Result<Value, GatewayError> {
        let trader = self.require_trader()?;
        let _busy = self.in_flight.acquire(ActionKind::CancelOrder)?;
        let order_id = required("order id", order_id)?;

        let ack = self
            .send(ActionKind::CancelOrder, self.api.cancel_order(order_id, Some(trader)))
            .await?;
        self.refresher.refresh_now().await;
        Ok(ack)
    }

    /// `POST /pool/supply`
    pub async fn supply(&self, form: &mut SupplyForm) -> Result<Value, GatewayError> {
        let trader = self.require_trader()?;
        let _busy = self.in_flight.acquire(ActionKind::Supply)?;
        let req = SupplyRequest {
            trader: trader.to_string(),
            amount: number("amount", &form.amount)?,
        };

        let ack = self.send(ActionKind::Supply, self.api.supply(&req)).await?;
        form.clear();
        self.refresher.refresh_now().await;
        Ok(ack)
    }

    /// `POST /pool/borrow`
    pub async fn borrow(&self, form: &mut BorrowForm) -> Result<Value, GatewayError> {
        let trader = self.require_trader()?;
        let _busy = self.in_flight.acquire(ActionKind::Borrow)?;
        let req = BorrowRequest {
            trader:     trader.to_string(),
            collateral: number("collateral", &form.collateral)?,
            amount:     number("amount", &form.amount)?,
        };

        let ack = self.send(ActionKind::Borrow, self.api.borrow(&req)).await?;
        form.clear();
        self.refresher.refresh_now().await;
        Ok(ack)
    }

    /// `POST /pool/repay`
    pub async fn repay(&self, form: &mut RepayForm) -> Result<Value, GatewayError> {
        let trader = self.require_trader()?;
        let _busy = self.in_flight.acquire(ActionKind::Repay)?;
        let req = RepayRequest {
            trader:      trader.to_string(),
            position_id: required("position id", &form.position_id)?.to_string(),
            amount:      number("amount", &form.amount)?,
        };

        let ack = self.send(ActionKind::Repay, self.api.repay(&req)).await?;
        form.clear();
        self.refresher.refresh_now().await;
        Ok(ack)
    }

    fn require_trader(&self) -> Result<&str, ValidationError> {
        self.trader.as_deref().ok_or(ValidationError::MissingTrader)
    }

    async fn send<F>(&self, action: ActionKind, call: F) -> Result<Value, ActionError>
    where
        F: Future<Output = Result<Value, NetworkError>>,
    {
        info!(action = %action, trader = ?self.trader, "Dispatching action");

        match call.await {
            Ok(ack) => {
                info!(action = %action, "Action accepted");
                self.events.publish(DashboardEvent::ActionSucceeded { action });
                Ok(ack)
            }
            Err(source) => {
                error!(action = %action, error = %source, "Action failed, input kept");
                self.events.publish(DashboardEvent::ActionFailed {
                    action,
                    message: source.to_string(),
                });
                Err(ActionError { action, source })
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::models::{OrderbookResponse, PoolSnapshot, Position, PriceQuote, Trade};

    /// Records every write; fails them all when `fail` is set.
    #[derive(Default)]
    struct MockApi {
        fail:  bool,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl MockApi {
        fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn write(&self, call: String) -> Result<Value, NetworkError> {
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(NetworkError::Status {
                    endpoint: "POST /api/test".into(),
                    status:   400,
                    body:     "insufficient collateral".into(),
                });
            }
            Ok(json!({ "status": "ok" }))
        }
    }

    #[async_trait]
    impl BackendApi for MockApi {
        async fn orderbook(&self) -> Result<OrderbookResponse, NetworkError> {
            Ok(OrderbookResponse::default())
        }
        async fn place_order(&self, req: &PlaceOrderRequest) -> Result<Value, NetworkError> {
            self.write(format!("place {} {} {} {}", req.trader, req.side, req.price, req.quantity)).await
        }
        async fn cancel_order(&self, id: &str, trader: Option<&str>) -> Result<Value, NetworkError> {
            self.write(format!("cancel {id} {}", trader.unwrap_or("-"))).await
        }
        async fn trades(&self, _: &str) -> Result<Vec<Trade>, NetworkError> {
            Ok(vec![])
        }
        async fn pool(&self) -> Result<PoolSnapshot, NetworkError> {
            Ok(PoolSnapshot::default())
        }
        async fn supply(&self, req: &SupplyRequest) -> Result<Value, NetworkError> {
            self.write(format!("supply {} {}", req.trader, req.amount)).await
        }
        async fn borrow(&self, req: &BorrowRequest) -> Result<Value, NetworkError> {
            self.write(format!("borrow {} {} {}", req.trader, req.collateral, req.amount)).await
        }
        async fn repay(&self, req: &RepayRequest) -> Result<Value, NetworkError> {
            self.write(format!("repay {} {} {}", req.trader, req.position_id, req.amount)).await
        }
        async fn positions(&self, _: &str) -> Result<Vec<Position>, NetworkError> {
            Ok(vec![])
        }
        async fn oracle(&self) -> Result<PriceQuote, NetworkError> {
            Ok(PriceQuote::default())
        }
    }

    #[derive(Default)]
    struct CountingRefresh(AtomicUsize);

    #[async_trait]
    impl Refresh for CountingRefresh {
        async fn refresh_now(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gateway(api: Arc<MockApi>, trader: Option<&str>) -> (ActionGateway, Arc<CountingRefresh>, EventBus) {
        let refresh = Arc::new(CountingRefresh::default());
        let bus = EventBus::new();
        let gw = ActionGateway::new(api, trader.map(str::to_string), refresh.clone(), bus.clone());
        (gw, refresh, bus)
    }

    fn order_form(price: &str, quantity: &str) -> OrderForm {
        OrderForm { side: Side::Sell, price: price.into(), quantity: quantity.into() }
    }

    #[tokio::test]
    async fn test_place_success_clears_form_then_refreshes() {
        let api = Arc::new(MockApi::default());
        let (gw, refresh, _) = gateway(api.clone(), Some("alice"));
        let mut form = order_form("101.5", "2");

        gw.place(&mut form).await.unwrap();

        assert_eq!(api.calls(), vec!["place alice sell 101.5 2"]);
        assert_eq!(form.price, "");
        assert_eq!(form.quantity, "");
        assert_eq!(form.side, Side::Sell);
        assert_eq!(refresh.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_field_is_local_and_sends_nothing() {
        let api = Arc::new(MockApi::default());
        let (gw, refresh, _) = gateway(api.clone(), Some("alice"));
        let mut form = order_form("", "2");

        let err = gw.place(&mut form).await.unwrap_err();

        assert_eq!(err, GatewayError::Validation(ValidationError::Missing { field: "price" }));
        assert!(err.is_local());
        assert!(api.calls().is_empty());
        assert_eq!(refresh.0.load(Ordering::SeqCst), 0);
        assert_eq!(form.quantity, "2");
    }

    #[tokio::test]
    async fn test_unparseable_number_is_rejected() {
        let api = Arc::new(MockApi::default());
        let (gw, _, _) = gateway(api.clone(), Some("alice"));
        let mut form = SupplyForm { amount: "12abc".into() };

        let err = gw.supply(&mut form).await.unwrap_err();

        assert_eq!(
            err,
            GatewayError::Validation(ValidationError::Unparseable { field: "amount", value: "12abc".into() })
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_input_and_publishes_event() {
        let api = Arc::new(MockApi::failing());
        let (gw, refresh, bus) = gateway(api.clone(), Some("alice"));
        let mut rx = bus.subscribe();
        let mut form = BorrowForm { collateral: "10".into(), amount: "900".into() };

        let err = gw.borrow(&mut form).await.unwrap_err();

        assert!(matches!(err, GatewayError::Action(ActionError { action: ActionKind::Borrow, .. })));
        assert_eq!(form, BorrowForm { collateral: "10".into(), amount: "900".into() });
        assert_eq!(refresh.0.load(Ordering::SeqCst), 0);

        let v: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(v["event"], "ACTION_FAILED");
        assert_eq!(v["action"], "BORROW");
    }

    #[tokio::test]
    async fn test_logged_out_short_circuits() {
        let api = Arc::new(MockApi::default());
        let (gw, _, _) = gateway(api.clone(), None);

        let err = gw.supply(&mut SupplyForm { amount: "5".into() }).await.unwrap_err();
        assert_eq!(err, GatewayError::Validation(ValidationError::MissingTrader));

        let err = gw.cancel("o-1").await.unwrap_err();
        assert_eq!(err, GatewayError::Validation(ValidationError::MissingTrader));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_sends_trader_and_refreshes() {
        let api = Arc::new(MockApi::default());
        let (gw, refresh, _) = gateway(api.clone(), Some("bob"));

        gw.cancel("o-7").await.unwrap();

        assert_eq!(api.calls(), vec!["cancel o-7 bob"]);
        assert_eq!(refresh.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repay_requires_position() {
        let api = Arc::new(MockApi::default());
        let (gw, _, _) = gateway(api.clone(), Some("bob"));
        let mut form = RepayForm { position_id: " ".into(), amount: "10".into() };

        let err = gw.repay(&mut form).await.unwrap_err();
        assert_eq!(err, GatewayError::Validation(ValidationError::Missing { field: "position id" }));

        form.position_id = "pos-1".into();
        gw.repay(&mut form).await.unwrap();
        assert_eq!(api.calls(), vec!["repay bob pos-1 10"]);
        assert_eq!(form, RepayForm::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_of_same_action_is_busy() {
        let api = Arc::new(MockApi { delay: Some(Duration::from_millis(100)), ..MockApi::default() });
        let (gw, _, _) = gateway(api.clone(), Some("alice"));

        let mut first = SupplyForm { amount: "1".into() };
        let mut second = SupplyForm { amount: "2".into() };
        let mut borrow = BorrowForm { collateral: "1".into(), amount: "1".into() };

        let (a, b, c) = tokio::join!(gw.supply(&mut first), gw.supply(&mut second), gw.borrow(&mut borrow));

        assert!(a.is_ok());
        assert_eq!(b.unwrap_err(), GatewayError::Validation(ValidationError::Busy(ActionKind::Supply)));
        assert!(c.is_ok());

        // released once the first one settled
        gw.supply(&mut second).await.unwrap();
        assert_eq!(api.calls().len(), 3);
    }

    #[test]
    fn test_borrow_preview_inputs_are_lenient() {
        let form = BorrowForm { collateral: "10".into(), amount: "abc".into() };
        assert_eq!(form.preview_inputs(), (10.0, 0.0));
    }
}
