//! Accounting engine trait.
//!
//! This is the boundary the presentation layer talks to: every operation
//! returns either a success value or one of the typed failures in
//! [`crate::Error`], with enough structured detail to render a precise
//! message. The presentation layer has no access to ledger-store internals.

use async_trait::async_trait;

use crate::errors::Result;
use crate::ledger::Order;
use crate::money::Money;
use crate::portfolio::{PortfolioEntry, PortfolioSnapshot};

/// Request to execute a buy or sell order.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub security_name: String,
    pub quantity: i64,
}

#[async_trait]
pub trait AccountingServiceTrait: Send + Sync {
    /// Onboard the user if unseen: one transaction that creates the row,
    /// records the initial allowance grant and credits the starting
    /// balance. Idempotent.
    async fn ensure_user(&self, user_id: &str) -> Result<()>;

    /// The user's cash balance - always the signed sum of their
    /// transactions.
    async fn balance(&self, user_id: &str) -> Result<Money>;

    /// Execute a buy at the oracle's current price, debiting the cost.
    async fn buy(&self, request: CreateOrderRequest) -> Result<Order>;

    /// Execute a sell at the oracle's current price, crediting the
    /// proceeds. Fails if the user holds less than the requested quantity.
    async fn sell(&self, request: CreateOrderRequest) -> Result<Order>;

    /// The user's current holdings valued at market price.
    async fn portfolio(&self, user_id: &str) -> Result<Vec<PortfolioEntry>>;

    /// Move money between two users; conserves the total exactly.
    async fn gift(&self, from_user_id: &str, to_user_id: &str, amount: Money) -> Result<()>;

    /// Grant the weekly allowance to every eligible user, all-or-nothing.
    /// Returns the number of users granted.
    async fn disburse_allowances(&self) -> Result<usize>;

    /// Persist today's portfolio snapshot for every known user,
    /// all-or-nothing. Returns the number of users captured.
    async fn capture_snapshots(&self) -> Result<usize>;

    /// Stored snapshots ascending, with a fresh non-persisted snapshot of
    /// the current portfolio appended.
    async fn portfolio_history(&self, user_id: &str) -> Result<Vec<PortfolioSnapshot>>;
}
