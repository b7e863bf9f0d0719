//! # models::lending
//!
//! Lending pool wire types and their boundary normalization.
//!
//! Backends disagree on field names (`totalSupplied` vs `totalSupply`) and
//! the oracle answers with either `price` or `ccPrice`, so every raw response
//! is resolved into one canonical shape here before it enters a snapshot.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::risk;

/// Collateral price assumed until the oracle has answered at least once.
pub const DEFAULT_CC_PRICE: f64 = 100.0;

// ─── Pool ─────────────────────────────────────────────────────────────────────

/// Normalized pool statistics. `utilization` is always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub total_supplied: f64,
    pub total_borrowed: f64,
    pub utilization:    f64,
    pub supply_apy:     f64,
    pub borrow_apy:     f64,
}

/// Raw `GET /api/pool` body. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolResponse {
    #[serde(default, alias = "totalSupply")]
    pub total_supplied: Option<f64>,
    #[serde(default, alias = "totalBorrows")]
    pub total_borrowed: Option<f64>,
    #[serde(default)]
    pub utilization:    Option<f64>,
    #[serde(default)]
    pub supply_apy:     Option<f64>,
    #[serde(default)]
    pub borrow_apy:     Option<f64>,
}

impl From<PoolResponse> for PoolSnapshot {
    fn from(raw: PoolResponse) -> Self {
        let total_supplied = raw.total_supplied.unwrap_or(0.0);
        let total_borrowed = raw.total_borrowed.unwrap_or(0.0);
        let utilization = match raw.utilization {
            Some(u) if u.is_finite() => u.clamp(0.0, 1.0),
            _ => risk::utilization(total_supplied, total_borrowed),
        };

        Self {
            total_supplied,
            total_borrowed,
            utilization,
            supply_apy: raw.supply_apy.unwrap_or(0.0),
            borrow_apy: raw.borrow_apy.unwrap_or(0.0),
        }
    }
}

// ─── Position ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Supply,
    Borrow,
}

/// A supply or borrow position of the logged-in trader.
///
/// `health_factor == None` means "not computed for this position type"
/// (supply positions never carry one). `Some(f64::INFINITY)` means the borrow
/// amount is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id:     String,
    #[serde(rename = "type")]
    pub kind:   PositionKind,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral: Option<f64>,
    #[serde(
        default,
        deserialize_with = "de_health_factor",
        serialize_with = "ser_health_factor",
        skip_serializing_if = "Option::is_none"
    )]
    pub health_factor: Option<f64>,
}

impl Position {
    /// Parse a `GET /api/positions/{trader}` body. Anything other than a JSON
    /// array is treated as "no positions".
    pub fn list_from_value(value: serde_json::Value) -> Result<Vec<Position>, serde_json::Error> {
        if value.is_array() {
            serde_json::from_value(value)
        } else {
            Ok(Vec::new())
        }
    }
}

/// JSON has no infinity literal, so backends send `"Infinity"` for a
/// debt-free borrow position.
fn de_health_factor<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "infinity" | "+infinity" | "inf" | "+inf" => Ok(Some(f64::INFINITY)),
            other => other.parse::<f64>().map(Some).map_err(serde::de::Error::custom),
        },
    }
}

fn ser_health_factor<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) if v.is_infinite() && v.is_sign_positive() => serializer.serialize_str("Infinity"),
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

// ─── Oracle ───────────────────────────────────────────────────────────────────

/// Oracle price of the collateral asset in quote-currency units. Always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub cc_price: f64,
}

impl Default for PriceQuote {
    fn default() -> Self {
        Self { cc_price: DEFAULT_CC_PRICE }
    }
}

/// Raw `GET /api/oracle` body: `{ "price": .. }` or `{ "ccPrice": .. }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OracleResponse {
    #[serde(default)]
    pub price:    Option<f64>,
    #[serde(default, rename = "ccPrice")]
    pub cc_price: Option<f64>,
}

impl From<OracleResponse> for PriceQuote {
    /// First positive of `price`, `ccPrice`, else [`DEFAULT_CC_PRICE`].
    fn from(raw: OracleResponse) -> Self {
        let cc_price = [raw.price, raw.cc_price]
            .into_iter()
            .flatten()
            .find(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(DEFAULT_CC_PRICE);
        Self { cc_price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quote(v: serde_json::Value) -> PriceQuote {
        serde_json::from_value::<OracleResponse>(v).unwrap().into()
    }

    #[test]
    fn test_oracle_accepts_either_key() {
        assert_eq!(quote(json!({ "price": 0.16 })).cc_price, 0.16);
        assert_eq!(quote(json!({ "ccPrice": 0.17 })).cc_price, 0.17);
        assert_eq!(quote(json!({})).cc_price, DEFAULT_CC_PRICE);
    }

    #[test]
    fn test_oracle_zero_price_falls_through() {
        assert_eq!(quote(json!({ "price": 0.0, "ccPrice": 2.5 })).cc_price, 2.5);
        assert_eq!(quote(json!({ "price": 0.0 })).cc_price, DEFAULT_CC_PRICE);
    }

    #[test]
    fn test_pool_aliases_and_derived_utilization() {
        let raw: PoolResponse = serde_json::from_value(json!({
            "totalSupply": 1000.0,
            "totalBorrows": 250.0
        })).unwrap();
        let pool = PoolSnapshot::from(raw);
        assert_eq!(pool.total_supplied, 1000.0);
        assert_eq!(pool.total_borrowed, 250.0);
        assert_eq!(pool.utilization, 0.25);
        assert_eq!(pool.supply_apy, 0.0);
    }

    #[test]
    fn test_pool_utilization_clamped() {
        let raw: PoolResponse = serde_json::from_value(json!({ "utilization": 1.7 })).unwrap();
        assert_eq!(PoolSnapshot::from(raw).utilization, 1.0);
    }

    #[test]
    fn test_position_health_factor_forms() {
        let list = Position::list_from_value(json!([
            { "id": "s1", "type": "supply", "amount": 500.0 },
            { "id": "b1", "type": "borrow", "amount": 0.0, "collateral": 10.0, "healthFactor": "Infinity" },
            { "id": "b2", "type": "borrow", "amount": 500.0, "collateral": 10.0, "healthFactor": 1.2 }
        ])).unwrap();

        assert_eq!(list[0].health_factor, None);
        assert_eq!(list[1].health_factor, Some(f64::INFINITY));
        assert_eq!(list[2].health_factor, Some(1.2));
        assert_eq!(list[2].kind, PositionKind::Borrow);
    }

    #[test]
    fn test_positions_non_array_is_empty() {
        let list = Position::list_from_value(json!({ "supply": [], "borrow": [] })).unwrap();
        assert!(list.is_empty());
    }
}
