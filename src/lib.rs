//! # Umbra Dashboard Core
//!
//! State synchronization and domain math behind the Umbra dark pool and
//! lending dashboard.
//!
//! ```text
//!  ActionGateway ──▶ backend ──▶ SyncLoop (tick / refresh_now)
//!                                   │
//!                              raw snapshot
//!                                   │
//!                    RiskEngine / BookAggregator
//!                                   │
//!                            view models ──▶ presentation
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod state;
pub mod views;

pub use config::Config;
pub use error::{ActionError, GatewayError, NetworkError, ValidationError};
pub use state::{AppState, Session};
