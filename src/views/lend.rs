//! # views::lend: Lending view
//!
//! Polls pool statistics and the collateral oracle (always) and the trader's
//! positions (logged in only). Risk metrics are derived on render.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::api::BackendApi;
use crate::engine::risk::{format_health_factor, BorrowPreview, RiskTier};
use crate::engine::sync::{Apply, Resource, SyncHandle, SyncLoop};
use crate::error::NetworkError;
use crate::events::EventBus;
use crate::gateway::{ActionGateway, BorrowForm};
use crate::models::{PoolSnapshot, Position, PositionKind, PriceQuote, Trader};
use crate::state::Session;

pub const VIEW: &str = "lend";

// ─── Snapshot ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LendSnapshot {
    pub pool:      PoolSnapshot,
    pub price:     PriceQuote,
    pub positions: Vec<Position>,
}

// ─── Resources ────────────────────────────────────────────────────────────────

/// `GET /pool`
pub struct PoolResource {
    api: Arc<dyn BackendApi>,
}

#[async_trait]
impl Resource<LendSnapshot> for PoolResource {
    fn name(&self) -> &'static str {
        "pool"
    }

    async fn fetch(&self) -> Result<Apply<LendSnapshot>, NetworkError> {
        let pool = self.api.pool().await?;
        Ok(Box::new(move |snap: &mut LendSnapshot| snap.pool = pool))
    }
}

/// `GET /oracle`
pub struct OracleResource {
    api: Arc<dyn BackendApi>,
}

#[async_trait]
impl Resource<LendSnapshot> for OracleResource {
    fn name(&self) -> &'static str {
        "oracle"
    }

    async fn fetch(&self) -> Result<Apply<LendSnapshot>, NetworkError> {
        let price = self.api.oracle().await?;
        Ok(Box::new(move |snap: &mut LendSnapshot| snap.price = price))
    }
}

/// `GET /positions/{trader}`
pub struct PositionsResource {
    api:    Arc<dyn BackendApi>,
    trader: Trader,
}

#[async_trait]
impl Resource<LendSnapshot> for PositionsResource {
    fn name(&self) -> &'static str {
        "positions"
    }

    async fn fetch(&self) -> Result<Apply<LendSnapshot>, NetworkError> {
        let positions = self.api.positions(&self.trader).await?;
        Ok(Box::new(move |snap: &mut LendSnapshot| snap.positions = positions))
    }
}

// ─── View Model ───────────────────────────────────────────────────────────────

/// A position with its display tier. Supply positions carry no health factor
/// and therefore no tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRow {
    #[serde(flatten)]
    pub position:     Position,
    pub tier:         Option<RiskTier>,
    pub health_label: Option<String>,
}

impl From<&Position> for PositionRow {
    fn from(p: &Position) -> Self {
        Self {
            position:     p.clone(),
            tier:         p.health_factor.map(RiskTier::classify),
            health_label: p.health_factor.map(format_health_factor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LendBoard {
    pub pool:             PoolSnapshot,
    pub cc_price:         f64,
    pub supply_positions: Vec<Position>,
    pub positions:        Vec<PositionRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LendViewModel {
    LoggedOut { message: &'static str },
    Active(LendBoard),
}

impl LendViewModel {
    pub fn derive(snapshot: &LendSnapshot, trader: Option<&str>) -> Self {
        if trader.is_none() {
            return LendViewModel::LoggedOut { message: "Please log in to access lending." };
        }

        LendViewModel::Active(LendBoard {
            pool:             snapshot.pool,
            cc_price:         snapshot.price.cc_price,
            supply_positions: snapshot
                .positions
                .iter()
                .filter(|p| p.kind == PositionKind::Supply)
                .cloned()
                .collect(),
            positions:        snapshot.positions.iter().map(PositionRow::from).collect(),
        })
    }
}

/// Live metrics for the borrow form at the given collateral price.
pub fn borrow_preview(form: &BorrowForm, price: &PriceQuote) -> BorrowPreview {
    let (collateral, amount) = form.preview_inputs();
    BorrowPreview::compute(collateral, price.cc_price, amount)
}

// ─── Mounted View ─────────────────────────────────────────────────────────────

/// A running lend view. Dropping it stops its polling.
pub struct LendView {
    sync:    SyncLoop<LendSnapshot>,
    gateway: ActionGateway,
    trader:  Option<Trader>,
}

impl LendView {
    pub fn mount(api: Arc<dyn BackendApi>, session: &Session, events: EventBus, interval: Duration) -> Self {
        let trader = session.trader().map(str::to_string);

        let mut builder = SyncLoop::builder(VIEW, LendSnapshot::default())
            .events(events.clone())
            .resource(PoolResource { api: Arc::clone(&api) })
            .resource(OracleResource { api: Arc::clone(&api) });
        if let Some(t) = &trader {
            builder = builder.resource(PositionsResource { api: Arc::clone(&api), trader: t.clone() });
        }

        let mut sync = builder.build();
        sync.start(interval);

        let gateway = ActionGateway::new(api, trader.clone(), Arc::new(sync.handle()), events);
        Self { sync, gateway, trader }
    }

    pub async fn render(&self) -> LendViewModel {
        let trader = self.trader.as_deref();
        self.sync.handle().read(|snap| LendViewModel::derive(snap, trader)).await
    }

    /// Preview against the latest oracle price (100 until it first answers).
    pub async fn borrow_preview(&self, form: &BorrowForm) -> BorrowPreview {
        self.sync.handle().read(|snap| borrow_preview(form, &snap.price)).await
    }

    pub fn gateway(&self) -> &ActionGateway {
        &self.gateway
    }

    pub fn handle(&self) -> SyncHandle<LendSnapshot> {
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
