//! Price provider trait definition.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::Quote;

/// Trait for latest-price providers.
///
/// Implement this trait to add support for a new price source. Providers
/// fetch one symbol at a time; batching and caching are the caller's
/// concern.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "ALPHA_VANTAGE". Used for logging
    /// and error attribution.
    fn id(&self) -> &'static str;

    /// Fetch the latest quote for a symbol.
    ///
    /// Returns the most recent quote on success, or a [`MarketDataError`]
    /// describing why the symbol could not be priced.
    async fn latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;
}
