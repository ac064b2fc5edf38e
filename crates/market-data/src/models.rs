//! Quote model shared by all providers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single latest-price observation for a symbol.
///
/// Prices are carried as [`Decimal`] exactly as the provider reported them;
/// conversion to minor currency units happens at the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: Decimal, currency: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            currency: currency.into(),
            timestamp: Utc::now(),
        }
    }
}
