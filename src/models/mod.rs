//! Domain models shared across the dashboard core.

pub mod book;
pub mod lending;

pub use book::{Order, OrderBook, OrderBookLevel, OrderbookResponse, Side, Trade};
pub use lending::{OracleResponse, PoolResponse, PoolSnapshot, Position, PositionKind, PriceQuote};

/// Opaque trader identity. Keys every per-trader resource.
pub type Trader = String;
