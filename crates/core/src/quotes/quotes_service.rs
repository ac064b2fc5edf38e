//! Price service: TTL-cached oracle over a market data provider.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::try_join_all;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use paperfolio_market_data::provider::PriceProvider;

use super::quotes_traits::PriceOracleTrait;
use crate::constants::PRICE_CACHE_TTL;
use crate::errors::{Error, Result};
use crate::money::Money;

struct CachedPrice {
    price: Money,
    fetched_at: Instant,
}

/// [`PriceOracleTrait`] implementation that caches provider prices per
/// symbol for a bounded time window.
///
/// Caching is an optimization only: expired entries are plain misses and are
/// refetched, and the service behaves identically (modulo staleness inside
/// the window) with a zero TTL.
pub struct PriceService {
    provider: Arc<dyn PriceProvider>,
    cache: DashMap<String, CachedPrice>,
    ttl: Duration,
}

impl PriceService {
    pub fn new(provider: Arc<dyn PriceProvider>) -> Self {
        Self::with_ttl(provider, PRICE_CACHE_TTL)
    }

    pub fn with_ttl(provider: Arc<dyn PriceProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
            ttl,
        }
    }

    fn cached(&self, symbol: &str) -> Option<Money> {
        let entry = self.cache.get(symbol)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.price.clone())
        } else {
            None
        }
    }

    async fn fetch(&self, symbol: &str) -> Result<Money> {
        let quote = self.provider.latest_quote(symbol).await.map_err(|e| {
            warn!("Could not price {} via {}: {}", symbol, self.provider.id(), e);
            Error::PriceUnavailable(symbol.to_string())
        })?;
        let price = Money::from_decimal(quote.price, &quote.currency)?;
        debug!("Priced {} at {}", symbol, price);
        self.cache.insert(
            symbol.to_string(),
            CachedPrice {
                price: price.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(price)
    }
}

#[async_trait]
impl PriceOracleTrait for PriceService {
    async fn price(&self, symbol: &str) -> Result<Money> {
        if let Some(price) = self.cached(symbol) {
            return Ok(price);
        }
        self.fetch(symbol).await
    }

    async fn prices(&self, symbols: &[String]) -> Result<HashMap<String, Money>> {
        // One logical round trip: the per-symbol fetches run concurrently
        // and the batch fails as a whole if any symbol fails.
        let pairs = try_join_all(symbols.iter().map(|symbol| async move {
            let price = self.price(symbol).await?;
            Ok::<_, Error>((symbol.clone(), price))
        }))
        .await?;
        Ok(pairs.into_iter().collect())
    }
}
