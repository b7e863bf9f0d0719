//! # views::trade: Dark Pool view
//!
//! Polls the order book (always) and the trader's fills (logged in only),
//! and derives depth ladders, the price chart and the recent-trade list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::api::BackendApi;
use crate::engine::book::{chart_series, trade_window, ChartPoint, DepthView, CHART_WINDOW, DEPTH_CAP, RECENT_TRADES_WINDOW};
use crate::engine::sync::{Apply, Resource, SyncHandle, SyncLoop};
use crate::error::NetworkError;
use crate::events::EventBus;
use crate::gateway::ActionGateway;
use crate::models::{Order, OrderBook, Trade, Trader};
use crate::state::Session;

pub const VIEW: &str = "trade";

// ─── Snapshot ─────────────────────────────────────────────────────────────────

/// Raw state of the trade view, one slice per resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeSnapshot {
    pub book:      OrderBook,
    pub my_orders: Vec<Order>,
    pub trades:    Vec<Trade>,
}

// ─── Resources ────────────────────────────────────────────────────────────────

/// `GET /orderbook`. Also carries the trader's resting orders when the
/// backend includes them.
pub struct OrderbookResource {
    api:    Arc<dyn BackendApi>,
    trader: Option<Trader>,
}

#[async_trait]
impl Resource<TradeSnapshot> for OrderbookResource {
    fn name(&self) -> &'static str {
        "orderbook"
    }

    async fn fetch(&self) -> Result<Apply<TradeSnapshot>, NetworkError> {
        let resp = self.api.orderbook().await?;
        let book = resp.book();
        let mine = match &self.trader {
            Some(trader) => resp.orders_for(trader),
            None => None,
        };

        Ok(Box::new(move |snap: &mut TradeSnapshot| {
            snap.book = book;
            if let Some(mine) = mine {
                snap.my_orders = mine;
            }
        }))
    }
}

/// `GET /trades/{trader}`
pub struct TradesResource {
    api:    Arc<dyn BackendApi>,
    trader: Trader,
}

#[async_trait]
impl Resource<TradeSnapshot> for TradesResource {
    fn name(&self) -> &'static str {
        "trades"
    }

    async fn fetch(&self) -> Result<Apply<TradeSnapshot>, NetworkError> {
        let trades = self.api.trades(&self.trader).await?;
        Ok(Box::new(move |snap: &mut TradeSnapshot| snap.trades = trades))
    }
}

// ─── View Model ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeBoard {
    pub depth:         DepthView,
    pub my_orders:     Vec<Order>,
    pub recent_trades: Vec<Trade>,
    pub chart:         Vec<ChartPoint>,
    /// Price of the most recent fill, if any.
    pub last_price:    Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TradeViewModel {
    LoggedOut { message: &'static str },
    Active(TradeBoard),
}

impl TradeViewModel {
    pub fn derive(snapshot: &TradeSnapshot, trader: Option<&str>) -> Self {
        if trader.is_none() {
            return TradeViewModel::LoggedOut { message: "Please log in to trade." };
        }

        TradeViewModel::Active(TradeBoard {
            depth:         DepthView::build(&snapshot.book, DEPTH_CAP),
            my_orders:     snapshot.my_orders.clone(),
            recent_trades: trade_window(&snapshot.trades, RECENT_TRADES_WINDOW).to_vec(),
            chart:         chart_series(&snapshot.trades, CHART_WINDOW),
            last_price:    snapshot.trades.first().map(|t| t.price),
        })
    }
}

// ─── Mounted View ─────────────────────────────────────────────────────────────

/// A running trade view. Dropping it stops its polling.
pub struct TradeView {
    sync:    SyncLoop<TradeSnapshot>,
    gateway: ActionGateway,
    trader:  Option<Trader>,
}

impl TradeView {
    /// Build the resources for `session`, start polling every `interval`.
    pub fn mount(api: Arc<dyn BackendApi>, session: &Session, events: EventBus, interval: Duration) -> Self {
        let trader = session.trader().map(str::to_string);

        let mut builder = SyncLoop::builder(VIEW, TradeSnapshot::default())
            .events(events.clone())
            .resource(OrderbookResource { api: Arc::clone(&api), trader: trader.clone() });
        if let Some(t) = &trader {
            builder = builder.resource(TradesResource { api: Arc::clone(&api), trader: t.clone() });
        }

        let mut sync = builder.build();
        sync.start(interval);

        let gateway = ActionGateway::new(api, trader.clone(), Arc::new(sync.handle()), events);
        Self { sync, gateway, trader }
    }

    pub async fn render(&self) -> TradeViewModel {
        let trader = self.trader.as_deref();
        self.sync.handle().read(|snap| TradeViewModel::derive(snap, trader)).await
    }

    pub fn gateway(&self) -> &ActionGateway {
        &self.gateway
    }

    pub fn handle(&self) -> SyncHandle<TradeSnapshot> {
        self.sync.handle()
    }

    pub async fn refresh_now(&self) {
        self.sync.refresh_now().await;
    }

    pub fn unmount(&mut self) {
        self.sync.stop();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
