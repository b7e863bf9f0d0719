//! # engine::risk: Collateralization Risk Engine
//!
//! Pure numeric functions over raw pool / position numbers. Nothing here
//! validates its inputs: callers guarantee non-negative quantities upstream.
//!
//! ## Metrics
//! 1. **Max borrowable**: `collateral × price × factor`
//! 2. **Health factor**: `(collateral × price) / (borrow × threshold)`, `+∞` without debt
//! 3. **Utilization**: `borrowed / supplied`, clamped to `[0, 1]`
//! 4. **Risk tier**: presentation-only banding of the health factor

use serde::Serialize;

// ─── Constants ────────────────────────────────────────────────────────────────

/// Fraction of collateral value that may be borrowed (≈ 1 / 1.5).
pub const COLLATERAL_FACTOR: f64 = 0.667;

/// Health factor below which a position becomes unsafe (150 % collateralization).
pub const LIQUIDATION_THRESHOLD: f64 = 1.5;

/// Lower bound of the warning band.
pub const WARNING_FLOOR: f64 = 1.0;

// ─── Params ───────────────────────────────────────────────────────────────────

/// Risk parameters. The process-wide constants are the defaults; a pool with
/// its own parameters overrides them here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub collateral_factor:     f64,
    pub liquidation_threshold: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            collateral_factor:     COLLATERAL_FACTOR,
            liquidation_threshold: LIQUIDATION_THRESHOLD,
        }
    }
}

impl RiskParams {
    pub fn max_borrowable(&self, collateral_qty: f64, price: f64) -> f64 {
        collateral_qty * price * self.collateral_factor
    }

    pub fn health_factor(&self, collateral_qty: f64, price: f64, borrow_qty: f64) -> f64 {
        if borrow_qty <= 0.0 {
            return f64::INFINITY;
        }
        (collateral_qty * price) / (borrow_qty * self.liquidation_threshold)
    }
}

// ─── Free Functions (default params) ─────────────────────────────────────────

/// Maximum stable-asset amount borrowable against `collateral_qty` at `price`.
#[inline]
pub fn max_borrowable(collateral_qty: f64, price: f64) -> f64 {
    RiskParams::default().max_borrowable(collateral_qty, price)
}

/// Health factor of a borrow. Returns `f64::INFINITY` when `borrow_qty <= 0`.
#[inline]
pub fn health_factor(collateral_qty: f64, price: f64, borrow_qty: f64) -> f64 {
    RiskParams::default().health_factor(collateral_qty, price, borrow_qty)
}

/// Share of pool liquidity currently borrowed.
pub fn utilization(total_supplied: f64, total_borrowed: f64) -> f64 {
    if total_supplied <= 0.0 {
        return 0.0;
    }
    let u = total_borrowed / total_supplied;
    if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 }
}

// ─── Tier ─────────────────────────────────────────────────────────────────────

/// Presentation banding of a health factor. Never used for enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// HF ≥ 1.5
    Safe,
    /// 1.0 ≤ HF < 1.5
    Warning,
    /// HF < 1.0
    Liquidatable,
}

impl RiskTier {
    pub fn classify(health_factor: f64) -> Self {
        if health_factor >= LIQUIDATION_THRESHOLD {
            RiskTier::Safe
        } else if health_factor >= WARNING_FLOOR {
            RiskTier::Warning
        } else {
            RiskTier::Liquidatable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Safe         => "safe",
            RiskTier::Warning      => "warning",
            RiskTier::Liquidatable => "liquidatable",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Borrow Preview ───────────────────────────────────────────────────────────

/// Live metrics shown next to the borrow form while the user types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowPreview {
    pub max_borrowable: f64,
    pub health_factor:  f64,
    pub tier:           RiskTier,
}

impl BorrowPreview {
    pub fn compute(collateral_qty: f64, price: f64, borrow_qty: f64) -> Self {
        let hf = health_factor(collateral_qty, price, borrow_qty);
        Self {
            max_borrowable: max_borrowable(collateral_qty, price),
            health_factor:  hf,
            tier:           RiskTier::classify(hf),
        }
    }
}

/// Format a health factor for display: `∞` for debt-free positions.
pub fn format_health_factor(hf: f64) -> String {
    if hf.is_infinite() && hf.is_sign_positive() {
        "∞".to_string()
    } else {
        format!("{hf:.2}")
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
