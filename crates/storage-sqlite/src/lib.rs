//! SQLite storage implementation for Paperfolio.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the ledger store traits defined in
//! `paperfolio-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The single-writer task that serializes all write transactions
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies
//! exist. `paperfolio-core` is database-agnostic and works with traits.
//!
//! ```text
//!        core (domain)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod ledger;
pub mod schema;

// Re-export database utilities
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool};

// Re-export the ledger store implementation
pub use ledger::SqliteLedger;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from paperfolio-core for convenience
pub use paperfolio_core::errors::{DatabaseError, Error, Result};
