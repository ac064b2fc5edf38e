//! In-memory ledger store.
//!
//! Faithful to the storage contract: each job runs against a private copy of
//! the state which replaces the shared state only when the job returns `Ok`,
//! so rollback-on-failure behaves exactly like the SQLite implementation.
//! Used by the engine's tests; not intended for production durability.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use uuid::Uuid;

use super::ledger_model::{
    NewOrder, NewTransaction, Order, OwnedSecurity, Transaction,
};
use super::ledger_traits::{LedgerStore, LedgerTx};
use crate::constants::ALLOWANCE_WINDOW_DAYS;
use crate::errors::Result;
use crate::money::Money;
use crate::portfolio::{PortfolioEntry, PortfolioSnapshot};

#[derive(Default, Clone)]
struct MemoryState {
    users: BTreeSet<String>,
    transactions: Vec<Transaction>,
    orders: Vec<Order>,
    grants: Vec<(String, DateTime<Utc>)>,
    snapshots: BTreeMap<(String, NaiveDate), Vec<PortfolioEntry>>,
}

/// In-memory [`LedgerStore`] with commit/rollback semantics.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

impl LedgerTx for MemoryTx<'_> {
    fn create_user(&mut self, user_id: &str) -> Result<bool> {
        Ok(self.state.users.insert(user_id.to_string()))
    }

    fn record_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            kind: new.kind,
            amount: new.amount,
            comment: new.comment,
            created_at: Utc::now(),
        };
        self.state.transactions.push(transaction.clone());
        Ok(transaction)
    }

    fn balance_of(&mut self, user_id: &str, currency: &str) -> Result<Money> {
        let mut balance = Money::zero(currency);
        for tx in self.state.transactions.iter().filter(|t| t.user_id == user_id) {
            let signed = tx.amount.checked_mul(tx.kind.sign())?;
            balance = balance.checked_add(&signed)?;
        }
        Ok(balance)
    }

    fn record_order(&mut self, new: NewOrder) -> Result<Order> {
        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            transaction_id: new.transaction_id,
            side: new.side,
            security_name: new.security_name,
            security_price: new.security_price,
            quantity: new.quantity,
            created_at: Utc::now(),
        };
        self.state.orders.push(order.clone());
        Ok(order)
    }

    fn owned_securities(&mut self, user_id: &str) -> Result<Vec<OwnedSecurity>> {
        let mut by_name: BTreeMap<String, (i64, Money)> = BTreeMap::new();
        for order in self.state.orders.iter().filter(|o| o.user_id == user_id) {
            let signed_quantity = order.side.sign() * order.quantity;
            let signed_paid = order
                .security_price
                .checked_mul(order.quantity)?
                .checked_mul(order.side.sign())?;
            match by_name.get_mut(&order.security_name) {
                Some((quantity, paid)) => {
                    *quantity += signed_quantity;
                    *paid = paid.checked_add(&signed_paid)?;
                }
                None => {
                    by_name.insert(order.security_name.clone(), (signed_quantity, signed_paid));
                }
            }
        }
        Ok(by_name
            .into_iter()
            .filter(|(_, (quantity, _))| *quantity > 0)
            .map(|(name, (quantity, total_price_paid))| OwnedSecurity {
                name,
                quantity,
                total_price_paid,
            })
            .collect())
    }

    fn net_quantity(&mut self, user_id: &str, security_name: &str) -> Result<i64> {
        Ok(self
            .state
            .orders
            .iter()
            .filter(|o| o.user_id == user_id && o.security_name == security_name)
            .map(|o| o.side.sign() * o.quantity)
            .sum())
    }

    fn record_allowance_grant(&mut self, user_id: &str) -> Result<()> {
        self.state.grants.push((user_id.to_string(), Utc::now()));
        Ok(())
    }

    fn eligible_for_allowance(&mut self) -> Result<Vec<String>> {
        let cutoff = Utc::now() - Duration::days(ALLOWANCE_WINDOW_DAYS);
        Ok(self
            .state
            .users
            .iter()
            .filter(|user| {
                !self
                    .state
                    .grants
                    .iter()
                    .any(|(grantee, at)| grantee == *user && *at > cutoff)
            })
            .cloned()
            .collect())
    }

    fn record_portfolio_snapshot(
        &mut self,
        user_id: &str,
        entries: &[PortfolioEntry],
    ) -> Result<()> {
        let today = Utc::now().date_naive();
        self.state
            .snapshots
            .insert((user_id.to_string(), today), entries.to_vec());
        Ok(())
    }

    fn portfolio_snapshots(&mut self, user_id: &str) -> Result<Vec<PortfolioSnapshot>> {
        // BTreeMap keys iterate (user, date) ascending, so within one user
        // the snapshots come out oldest first.
        Ok(self
            .state
            .snapshots
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, date), entries)| PortfolioSnapshot {
                created_at: DateTime::from_naive_utc_and_offset(
                    date.and_hms_opt(0, 0, 0).unwrap_or_default(),
                    Utc,
                ),
                entries: entries.clone(),
            })
            .collect())
    }

    fn all_user_ids(&mut self) -> Result<Vec<String>> {
        Ok(self.state.users.iter().cloned().collect())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn with_transaction<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.state.lock().unwrap();
        let mut working = guard.clone();
        let result = job(&mut MemoryTx {
            state: &mut working,
        });
        if result.is_ok() {
            *guard = working;
        }
        result
    }
}
