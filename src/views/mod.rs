//! Mounted views. Each owns one [`SyncLoop`](crate::engine::sync::SyncLoop)
//! and one [`ActionGateway`](crate::gateway::ActionGateway) wired to it.

pub mod lend;
pub mod trade;

pub use lend::{LendView, LendViewModel};
pub use trade::{TradeView, TradeViewModel};
