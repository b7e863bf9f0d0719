//! # models::book
//!
//! Dark pool wire types: order-book levels, resting orders and executed
//! trades, exactly as `GET /api/orderbook` and `GET /api/trades/{trader}`
//! deliver them.

use serde::{Deserialize, Serialize};

// ─── Side ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy  => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── OrderBookLevel ───────────────────────────────────────────────────────────

/// One aggregated price level. Sides arrive best-price-first; the core never
/// re-sorts them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price:    f64,
    pub quantity: f64,
}

impl OrderBookLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

// ─── Order ────────────────────────────────────────────────────────────────────

/// A resting order. Created through the gateway, removed by cancel or by
/// backend execution (only visible as its absence in the next snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id:       String,
    pub side:     Side,
    pub price:    f64,
    pub quantity: f64,
    #[serde(default)]
    pub trader:   String,
}

// ─── Trade ────────────────────────────────────────────────────────────────────

/// An executed fill. Immutable once observed; feeds are most-recent-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub price:     f64,
    #[serde(default)]
    pub quantity:  f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side:      Option<Side>,
}

// ─── Order Book ───────────────────────────────────────────────────────────────

/// Both sides of the book as held in the trade view snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

/// Raw `GET /api/orderbook` body.
///
/// Backends either expose every resting order (`orders`, filtered client-side
/// by trader) or only the caller's (`myOrders`). Both are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookResponse {
    #[serde(default)]
    pub bids:      Vec<OrderBookLevel>,
    #[serde(default)]
    pub asks:      Vec<OrderBookLevel>,
    #[serde(default)]
    pub orders:    Option<Vec<Order>>,
    #[serde(default)]
    pub my_orders: Option<Vec<Order>>,
}

impl OrderbookResponse {
    pub fn book(&self) -> OrderBook {
        OrderBook {
            bids: self.bids.clone(),
            asks: self.asks.clone(),
        }
    }

    /// Orders belonging to `trader`, or `None` when the response carries no
    /// order list at all (the caller keeps whatever it had).
    pub fn orders_for(&self, trader: &str) -> Option<Vec<Order>> {
        if let Some(all) = &self.orders {
            return Some(all.iter().filter(|o| o.trader == trader).cloned().collect());
        }
        self.my_orders.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orderbook_defaults_missing_sides() {
        let resp: OrderbookResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.bids.is_empty());
        assert!(resp.asks.is_empty());
        assert_eq!(resp.orders_for("alice"), None);
    }

    #[test]
    fn test_orders_filtered_by_trader() {
        let resp: OrderbookResponse = serde_json::from_value(serde_json::json!({
            "bids": [{ "price": 100.0, "quantity": 5.0 }],
            "asks": [],
            "orders": [
                { "id": "1", "side": "buy",  "price": 100.0, "quantity": 5.0, "trader": "alice" },
                { "id": "2", "side": "sell", "price": 101.0, "quantity": 1.0, "trader": "bob" }
            ]
        })).unwrap();

        let mine = resp.orders_for("alice").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "1");
        assert_eq!(mine[0].side, Side::Buy);
    }

    #[test]
    fn test_my_orders_used_verbatim_without_full_list() {
        let resp: OrderbookResponse = serde_json::from_value(serde_json::json!({
            "myOrders": [{ "id": "9", "side": "sell", "price": 2.0, "quantity": 3.0 }]
        })).unwrap();

        let mine = resp.orders_for("anyone").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].trader, "");
    }

    #[test]
    fn test_trade_optional_fields() {
        let t: Trade = serde_json::from_str(r#"{"price": 99.5, "quantity": 2}"#).unwrap();
        assert_eq!(t.timestamp, None);
        assert_eq!(t.side, None);
    }
}
