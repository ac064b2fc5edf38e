//! Price oracle trait.
//!
//! The accounting engine consumes prices only through this capability; any
//! failure to price a ticker surfaces as [`crate::Error::PriceUnavailable`]
//! and causes the surrounding operation to perform no writes.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::Result;
use crate::money::Money;

#[async_trait]
pub trait PriceOracleTrait: Send + Sync {
    /// Current unit price for one ticker.
    async fn price(&self, symbol: &str) -> Result<Money>;

    /// Current unit prices for a set of tickers, all-or-nothing: if any
    /// requested ticker cannot be priced the whole call fails.
    async fn prices(&self, symbols: &[String]) -> Result<HashMap<String, Money>>;
}
