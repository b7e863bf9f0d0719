//! # state
//!
//! The dashboard's **composition root**: one `AppState` holding everything
//! the views share, passed by reference to whatever mounts them.
//!
//! ```text
//!             AppState
//!   ┌───────────┬──────────┬───────────┬─────────┐
//!   │ Session   │ Backend  │ EventBus  │ Config  │
//!   │ (trader)  │ (Arc dyn)│ (notify)  │ (polls) │
//!   └─────┬─────┴────┬─────┴─────┬─────┴────┬────┘
//!         └──────────┴───────────┴──────────┘
//!                    │ mount_*()
//!         ┌──────────┴──────────┐
//!     TradeView              LendView
//!   (SyncLoop + Gateway)  (SyncLoop + Gateway)
//! ```
//!
//! The trader identity is fixed for the lifetime of a mounted view; a login
//! change means unmounting and mounting again.

use std::sync::Arc;

use crate::api::{BackendApi, HttpBackend};
use crate::config::Config;
use crate::events::EventBus;
use crate::models::Trader;
use crate::views::{LendView, TradeView};

// ─── Session ──────────────────────────────────────────────────────────────────

/// Who is using the dashboard. `None` renders the logged-out views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    trader: Option<Trader>,
}

impl Session {
    pub fn logged_in(trader: impl Into<Trader>) -> Self {
        Self { trader: Some(trader.into()) }
    }

    pub fn logged_out() -> Self {
        Self { trader: None }
    }

    pub fn trader(&self) -> Option<&str> {
        self.trader.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.trader.is_some()
    }
}

// ─── AppState ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub config:  Config,
    pub session: Session,
    /// Fetch capability shared by every resource and gateway
    pub api:     Arc<dyn BackendApi>,
    /// Notification / telemetry surface
    pub events:  EventBus,
}

impl AppState {
    /// Production wiring: HTTP backend from `config`, session from
    /// `UMBRA_TRADER`.
    pub fn new(config: Config) -> Self {
        let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::from_config(&config));
        Self::with_api(config, api)
    }

    /// Wire against any backend (tests, alternative transports).
    pub fn with_api(config: Config, api: Arc<dyn BackendApi>) -> Self {
        let session = match &config.trader {
            Some(t) => Session::logged_in(t.clone()),
            None => Session::logged_out(),
        };

        Self {
            config,
            session,
            api,
            events: EventBus::new(),
        }
    }

    pub fn mount_trade(&self) -> TradeView {
        TradeView::mount(Arc::clone(&self.api), &self.session, self.events.clone(), self.config.trade_poll)
    }

    pub fn mount_lend(&self) -> LendView {
        LendView::mount(Arc::clone(&self.api), &self.session, self.events.clone(), self.config.lend_poll)
    }
}
