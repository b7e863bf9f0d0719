//! # Umbra Dashboard: headless runner
//!
//! Mounts both views against the configured backend and logs what a user
//! would see, until Ctrl-C.
//!
//! ```text
//!  every TRADE_POLL_MS   ──▶ trade SyncLoop ──▶ orderbook, trades
//!  every LEND_POLL_MS    ──▶ lend SyncLoop  ──▶ pool, oracle, positions
//!  every RENDER_INTERVAL ──▶ render both views ──▶ tracing
//! ```
//!
//! See [`umbra_dashboard::config`] for the environment variables.

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use umbra_dashboard::engine::risk::format_health_factor;
use umbra_dashboard::views::{LendView, LendViewModel, TradeView, TradeViewModel};
use umbra_dashboard::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("umbra_dashboard=debug".parse()?)
            .add_directive("reqwest=warn".parse()?))
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════╗
  ║   UMBRA · Dark Pool & Lending Dashboard   ║
  ║   headless runner                         ║
  ╚═══════════════════════════════════════════╝"#);

    let config = Config::from_env().context("Failed to load config")?;

    info!(
        backend    = %config.api_url,
        trader     = ?config.trader,
        trade_poll = ?config.trade_poll,
        lend_poll  = ?config.lend_poll,
        "Umbra dashboard started"
    );

    let state = AppState::new(config);
    let mut trade = state.mount_trade();
    let mut lend = state.mount_lend();
    let mut events = state.events.subscribe();

    let mut render = tokio::time::interval(state.config.render_interval);
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = render.tick() => {
                render_trade(&trade).await;
                render_lend(&lend).await;
            }
            event = events.recv() => match event {
                Ok(json) => debug!(event = %json, "Dashboard event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Event subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                info!("Ctrl-C received, stopping sync loops");
                break;
            }
        }
    }

    trade.unmount();
    lend.unmount();
    info!("Umbra dashboard stopped");
    Ok(())
}

async fn render_trade(view: &TradeView) {
    match view.render().await {
        TradeViewModel::LoggedOut { message } => info!(view = "trade", "{message}"),
        TradeViewModel::Active(board) => {
            let best_bid = board.depth.bids.first().map(|r| r.price);
            let best_ask = board.depth.asks.first().map(|r| r.price);
            info!(
                view       = "trade",
                best_bid   = ?best_bid,
                best_ask   = ?best_ask,
                bid_levels = board.depth.bids.len(),
                ask_levels = board.depth.asks.len(),
                my_orders  = board.my_orders.len(),
                trades     = board.recent_trades.len(),
                last_price = ?board.last_price,
                "📈 Dark pool"
            );
        }
    }
}

async fn render_lend(view: &LendView) {
    match view.render().await {
        LendViewModel::LoggedOut { message } => info!(view = "lend", "{message}"),
        LendViewModel::Active(board) => {
            info!(
                view        = "lend",
                supplied    = board.pool.total_supplied,
                borrowed    = board.pool.total_borrowed,
                utilization = %format!("{:.1}%", board.pool.utilization * 100.0),
                cc_price    = board.cc_price,
                supplies    = board.supply_positions.len(),
                positions   = board.positions.len(),
                "🏦 Lending pool"
            );
            for row in board.positions.iter().filter(|r| r.tier.is_some()) {
                info!(
                    position = %row.position.id,
                    amount   = row.position.amount,
                    health   = %row.position.health_factor.map(format_health_factor).unwrap_or_default(),
                    tier     = ?row.tier,
                    "Borrow position"
                );
            }
        }
    }
}
