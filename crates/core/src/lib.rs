//! Paperfolio Core - Domain entities, services, and traits.
//!
//! This crate contains the accounting engine for the simulated-trading
//! ledger. It is database-agnostic and defines the ledger-store traits that
//! are implemented by the `storage-sqlite` crate, plus the price-oracle
//! abstraction backed by the `market-data` crate.

pub mod accounting;
pub mod constants;
pub mod errors;
pub mod ledger;
pub mod money;
pub mod portfolio;
pub mod quotes;
pub mod settings;

// Re-export common types
pub use money::{Money, MoneyError};
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
