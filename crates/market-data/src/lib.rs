//! Market data providers for Paperfolio.
//!
//! This crate defines the [`PriceProvider`] trait that all price sources
//! implement, the [`Quote`] model they return, and the production
//! Alpha Vantage provider. It knows nothing about the ledger; callers
//! convert quotes into money values themselves.

pub mod errors;
pub mod models;
pub mod provider;

pub use errors::MarketDataError;
pub use models::Quote;
pub use provider::{AlphaVantageProvider, PriceProvider};
