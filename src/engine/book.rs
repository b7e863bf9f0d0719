//! # engine::book: Book Aggregator
//!
//! Windows and normalizes raw order-book levels and trade feeds for display.
//! Ordering is always the backend's: nothing here sorts.

use serde::Serialize;

use crate::models::{OrderBook, OrderBookLevel, Trade};

/// Levels shown per side of the depth view.
pub const DEPTH_CAP: usize = 12;

/// Trades plotted on the price chart.
pub const CHART_WINDOW: usize = 50;

/// Trades listed under "recent trades".
pub const RECENT_TRADES_WINDOW: usize = 20;

// ─── Windowing ────────────────────────────────────────────────────────────────

/// First `cap` levels, order unchanged.
#[inline]
pub fn depth_view(levels: &[OrderBookLevel], cap: usize) -> &[OrderBookLevel] {
    &levels[..levels.len().min(cap)]
}

/// The `window_size` most recent trades of a most-recent-first feed, order
/// unchanged. Empty input yields an empty window (callers render an empty
/// state, not an error).
#[inline]
pub fn trade_window(trades: &[Trade], window_size: usize) -> &[Trade] {
    &trades[..trades.len().min(window_size)]
}

// ─── Width Normalization ──────────────────────────────────────────────────────

/// Scale for depth bars, computed once over every level on both sides.
///
/// The denominator is floored at 1 so an all-zero book renders every bar at 0
/// instead of dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthScale {
    max_quantity: f64,
}

impl DepthScale {
    pub fn new(bids: &[OrderBookLevel], asks: &[OrderBookLevel]) -> Self {
        let max_quantity = bids
            .iter()
            .chain(asks)
            .map(|l| l.quantity)
            .fold(1.0_f64, f64::max);
        Self { max_quantity }
    }

    pub fn max_quantity(&self) -> f64 {
        self.max_quantity
    }

    /// Bar width in percent, within `[0, 100]`.
    pub fn width(&self, level: &OrderBookLevel) -> f64 {
        let pct = level.quantity / self.max_quantity * 100.0;
        if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) }
    }
}

/// Width of `level` relative to the largest quantity on either side.
pub fn normalized_width(level: &OrderBookLevel, bids: &[OrderBookLevel], asks: &[OrderBookLevel]) -> f64 {
    DepthScale::new(bids, asks).width(level)
}

// ─── Depth View ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthRow {
    pub price:     f64,
    pub quantity:  f64,
    pub width_pct: f64,
}

/// Bounded, normalized order book ready for rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DepthView {
    pub bids: Vec<DepthRow>,
    pub asks: Vec<DepthRow>,
}

impl DepthView {
    /// Widths are scaled against the whole book, not only the visible rows.
    pub fn build(book: &OrderBook, cap: usize) -> Self {
        let scale = DepthScale::new(&book.bids, &book.asks);
        let rows = |levels: &[OrderBookLevel]| -> Vec<DepthRow> {
            depth_view(levels, cap)
                .iter()
                .map(|l| DepthRow {
                    price:     l.price,
                    quantity:  l.quantity,
                    width_pct: scale.width(l),
                })
                .collect()
        };

        Self {
            bids: rows(&book.bids),
            asks: rows(&book.asks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

// ─── Price Chart ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub index: usize,
    pub price: f64,
}

/// Price series over the chart window.
pub fn chart_series(trades: &[Trade], window_size: usize) -> Vec<ChartPoint> {
    trade_window(trades, window_size)
        .iter()
        .enumerate()
        .map(|(index, t)| ChartPoint { index, price: t.price })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
