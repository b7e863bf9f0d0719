//! # error
//!
//! Error taxonomy of the dashboard core.
//!
//! * [`ValidationError`]: bad local input, caught before any network call.
//! * [`NetworkError`]   : transport / HTTP / decode failure talking to the backend.
//! * [`ActionError`]    : a mutating call that reached the backend and failed.
//!
//! Read failures are absorbed per resource inside the sync loop; action
//! failures are surfaced as events. Nothing here is allowed to take the view
//! process down.

use thiserror::Error;

// ─── Validation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required input field is empty.
    #[error("{field} is required")]
    Missing { field: &'static str },

    /// A numeric input field does not hold a finite number.
    #[error("{field} is not a number: {value:?}")]
    Unparseable { field: &'static str, value: String },

    /// No trader is logged in.
    #[error("no trader is logged in")]
    MissingTrader,

    /// The same action is already in flight.
    #[error("{0} already in progress")]
    Busy(ActionKind),
}

// ─── Network ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// The request never produced a response (connect, timeout, TLS...).
    #[error("{endpoint} unreachable: {message}")]
    Unreachable { endpoint: String, message: String },

    /// The backend answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status { endpoint: String, status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("{endpoint} response parse error: {message}")]
    Decode { endpoint: String, message: String },
}

impl NetworkError {
    pub fn endpoint(&self) -> &str {
        match self {
            NetworkError::Unreachable { endpoint, .. }
            | NetworkError::Status { endpoint, .. }
            | NetworkError::Decode { endpoint, .. } => endpoint,
        }
    }
}

// ─── Actions ──────────────────────────────────────────────────────────────────

/// Every mutating intent the gateway can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    PlaceOrder,
    CancelOrder,
    Supply,
    Borrow,
    Repay,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::PlaceOrder  => "place order",
            ActionKind::CancelOrder => "cancel order",
            ActionKind::Supply      => "supply",
            ActionKind::Borrow      => "borrow",
            ActionKind::Repay       => "repay",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutating call failed after it was sent. User input is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{action} failed: {source}")]
pub struct ActionError {
    pub action: ActionKind,
    #[source]
    pub source: NetworkError,
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

/// What an [`ActionGateway`](crate::gateway::ActionGateway) call can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl GatewayError {
    /// `true` when nothing was sent to the backend.
    pub fn is_local(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }
}
