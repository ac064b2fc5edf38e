//! Portfolio valuation models.
//!
//! A portfolio entry is a holding valued at the current market price; a
//! snapshot is the point-in-time capture of all of a user's entries. Both
//! are derived - snapshots are the only derived data ever persisted, as an
//! opaque serialized blob keyed by user and date.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::RETURN_RATE_PRECISION;
use crate::errors::{Error, Result};
use crate::ledger::OwnedSecurity;
use crate::money::Money;

/// A holding valued at the current market price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntry {
    pub security_name: String,
    pub quantity: i64,
    pub total_price_paid: Money,
    /// Current market value: quantity x current unit price.
    pub balance: Money,
    /// Percentage change of `balance` versus `total_price_paid`, two
    /// decimal places.
    pub return_rate: Decimal,
}

/// A point-in-time capture of a user's portfolio, at date granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub created_at: DateTime<Utc>,
    pub entries: Vec<PortfolioEntry>,
}

/// `100 x (current - paid) / paid`, rounded to two decimal places.
///
/// Zero when nothing was paid - a position with no cost basis has no
/// meaningful return. The ratio's inputs stay in integer minor units; the
/// only rounding happens at the end.
pub fn return_rate(total_price_paid: &Money, current_balance: &Money) -> Decimal {
    let paid = total_price_paid.minor();
    if paid <= 0 {
        return Decimal::ZERO;
    }
    let diff = current_balance.minor() as i128 - paid as i128;
    let ratio = Decimal::from_i128_with_scale(diff * 100, 0) / Decimal::from(paid);
    ratio.round_dp(RETURN_RATE_PRECISION)
}

/// Value holdings against a price map.
///
/// Fails with [`Error::PriceUnavailable`] when any holding is missing a
/// price - partial portfolios are never returned.
pub fn value_holdings(
    holdings: &[OwnedSecurity],
    prices: &HashMap<String, Money>,
) -> Result<Vec<PortfolioEntry>> {
    holdings
        .iter()
        .map(|holding| {
            let price = prices
                .get(&holding.name)
                .ok_or_else(|| Error::PriceUnavailable(holding.name.clone()))?;
            let balance = price.checked_mul(holding.quantity)?;
            let return_rate = return_rate(&holding.total_price_paid, &balance);
            Ok(PortfolioEntry {
                security_name: holding.name.clone(),
                quantity: holding.quantity,
                total_price_paid: holding.total_price_paid.clone(),
                balance,
                return_rate,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holding(name: &str, quantity: i64, paid_minor: i64) -> OwnedSecurity {
        OwnedSecurity {
            name: name.to_string(),
            quantity,
            total_price_paid: Money::new(paid_minor, "USD"),
        }
    }

    #[test]
    fn return_rate_matches_percentage_gain() {
        // paid $500.00, now worth $600.00 -> +20.00%
        let rate = return_rate(&Money::new(50_000, "USD"), &Money::new(60_000, "USD"));
        assert_eq!(rate, dec!(20.00));
    }

    #[test]
    fn return_rate_is_zero_without_cost_basis() {
        assert_eq!(
            return_rate(&Money::new(0, "USD"), &Money::new(60_000, "USD")),
            Decimal::ZERO
        );
        assert_eq!(
            return_rate(&Money::new(-100, "USD"), &Money::new(60_000, "USD")),
            Decimal::ZERO
        );
    }

    #[test]
    fn return_rate_rounds_to_two_places() {
        // paid $3.00, now $4.00 -> 33.333...% -> 33.33%
        let rate = return_rate(&Money::new(300, "USD"), &Money::new(400, "USD"));
        assert_eq!(rate, dec!(33.33));
    }

    #[test]
    fn return_rate_can_be_negative() {
        let rate = return_rate(&Money::new(60_000, "USD"), &Money::new(50_000, "USD"));
        assert_eq!(rate, dec!(-16.67));
    }

    #[test]
    fn value_holdings_computes_balance_per_entry() {
        let holdings = vec![holding("ACME", 10, 50_000)];
        let prices = HashMap::from([("ACME".to_string(), Money::new(6_000, "USD"))]);

        let entries = value_holdings(&holdings, &prices).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].balance, Money::new(60_000, "USD"));
        assert_eq!(entries[0].return_rate, dec!(20.00));
    }

    #[test]
    fn value_holdings_fails_on_missing_price() {
        let holdings = vec![holding("ACME", 10, 50_000), holding("OTHER", 1, 100)];
        let prices = HashMap::from([("ACME".to_string(), Money::new(6_000, "USD"))]);

        let err = value_holdings(&holdings, &prices).unwrap_err();
        assert!(matches!(err, Error::PriceUnavailable(name) if name == "OTHER"));
    }
}
