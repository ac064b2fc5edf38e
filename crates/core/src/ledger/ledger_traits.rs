//! Ledger store traits.
//!
//! These traits define the storage contract without any database-specific
//! types. The production implementation lives in the `storage-sqlite` crate;
//! [`super::memory::MemoryLedger`] provides an in-memory implementation with
//! the same commit/rollback semantics for tests.

use async_trait::async_trait;

use super::ledger_model::{NewOrder, NewTransaction, Order, OwnedSecurity, Transaction};
use crate::errors::Result;
use crate::money::Money;
use crate::portfolio::{PortfolioEntry, PortfolioSnapshot};

/// Operations available inside one transaction scope.
///
/// Every call runs against the same underlying connection and transaction,
/// so a failure anywhere rolls back everything done so far in the scope.
pub trait LedgerTx {
    /// Insert the user if absent. Returns true iff a new row was created.
    /// Must be atomic - no separate existence check.
    fn create_user(&mut self, user_id: &str) -> Result<bool>;

    /// Append a cash movement; the store assigns id and timestamp.
    fn record_transaction(&mut self, new: NewTransaction) -> Result<Transaction>;

    /// Signed sum of the user's transactions in the given currency; zero if
    /// the user has no transactions.
    fn balance_of(&mut self, user_id: &str, currency: &str) -> Result<Money>;

    /// Append an executed order; the store assigns id and timestamp.
    fn record_order(&mut self, new: NewOrder) -> Result<Order>;

    /// Per-security signed aggregation of the user's orders, restricted to
    /// positive net quantity.
    fn owned_securities(&mut self, user_id: &str) -> Result<Vec<OwnedSecurity>>;

    /// Signed net quantity of one security held by the user.
    fn net_quantity(&mut self, user_id: &str, security_name: &str) -> Result<i64>;

    /// Mark an allowance disbursement for the user at the current time.
    fn record_allowance_grant(&mut self, user_id: &str) -> Result<()>;

    /// Users with no allowance grant inside the trailing eligibility window.
    fn eligible_for_allowance(&mut self) -> Result<Vec<String>>;

    /// Persist the day's portfolio snapshot for the user. Rewrites the
    /// snapshot if one already exists for the current date, so a same-day
    /// re-run is idempotent.
    fn record_portfolio_snapshot(&mut self, user_id: &str, entries: &[PortfolioEntry])
        -> Result<()>;

    /// Stored snapshots for the user, ordered by creation ascending.
    fn portfolio_snapshots(&mut self, user_id: &str) -> Result<Vec<PortfolioSnapshot>>;

    /// Every known user id.
    fn all_user_ids(&mut self) -> Result<Vec<String>>;
}

/// A store that executes jobs inside serializable transactions.
///
/// At most one transaction is active at a time; concurrent callers queue and
/// execute one after another. The job's `Ok` commits the scope, any `Err`
/// rolls it back and is propagated. A caller that stops awaiting does not
/// leave a transaction open - the in-flight scope still commits or rolls
/// back.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn with_transaction<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T> + Send + 'static,
        T: Send + 'static;
}
