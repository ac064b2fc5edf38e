use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::error;
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::sync::{mpsc, oneshot};

use paperfolio_core::constants::ALLOWANCE_WINDOW_DAYS;
use paperfolio_core::errors::DatabaseError;
use paperfolio_core::ledger::{
    LedgerStore, LedgerTx, NewOrder, NewTransaction, Order, OwnedSecurity, Transaction,
    TransactionKind,
};
use paperfolio_core::money::Money;
use paperfolio_core::portfolio::{PortfolioEntry, PortfolioSnapshot};
use paperfolio_core::{Error, Result};

use super::model::{
    format_timestamp, AllowanceDB, OrderDB, PositionRowDB, SnapshotDB, TransactionDB, UserDB,
};
use crate::db::DbPool;
use crate::errors::{IntoCore, StorageError};
use crate::schema::{allowances, orders, portfolio_snapshots, transactions, users};

// A queued unit of ledger work. Each job opens and finishes its own
// transaction and delivers its result through the oneshot it captured, so
// the queue itself stays untyped.
type LedgerJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

// Bounded so a stalled writer applies backpressure instead of piling up
// closures without limit.
const WRITE_QUEUE_DEPTH: usize = 256;

/// SQLite-backed [`LedgerStore`].
///
/// A dedicated writer task owns one pooled connection and runs queued jobs
/// strictly in order, each inside its own immediate transaction, so at most
/// one write transaction is ever active and concurrent callers queue behind
/// each other.
pub struct SqliteLedger {
    jobs: mpsc::Sender<LedgerJob>,
}

impl SqliteLedger {
    pub fn new(pool: DbPool) -> Self {
        let (jobs, mut queue) = mpsc::channel::<LedgerJob>(WRITE_QUEUE_DEPTH);
        tokio::spawn(async move {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Ledger writer could not acquire a connection: {}", e);
                    return;
                }
            };
            while let Some(job) = queue.recv().await {
                job(&mut conn);
            }
            // The queue closing means every store handle is gone.
        });
        Self { jobs }
    }
}

fn writer_gone() -> Error {
    Error::Database(DatabaseError::TransactionFailed(
        "ledger writer task is not running".to_string(),
    ))
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn with_transaction<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let wrapped: LedgerJob = Box::new(move |conn| {
            // The transaction closure needs an error type implementing
            // From<diesel::result::Error>, so the job's core error is routed
            // through StorageError and converted back at the boundary.
            let result = conn
                .immediate_transaction::<_, StorageError, _>(|c| {
                    job(&mut SqliteLedgerTx { conn: c }).map_err(StorageError::from)
                })
                .map_err(Error::from);
            // A caller that stopped waiting dropped its receiver; the
            // transaction above has still committed or rolled back.
            let _ = reply.send(result);
        });

        self.jobs.send(wrapped).await.map_err(|_| writer_gone())?;
        outcome.await.map_err(|_| writer_gone())?
    }
}

/// [`LedgerTx`] implementation over the writer task's open transaction.
struct SqliteLedgerTx<'a> {
    conn: &'a mut SqliteConnection,
}

impl LedgerTx for SqliteLedgerTx<'_> {
    fn create_user(&mut self, user_id: &str) -> Result<bool> {
        // ON CONFLICT DO NOTHING makes insert-if-absent a single atomic
        // statement; the affected-row count tells us whether it was new.
        let inserted = diesel::insert_into(users::table)
            .values(UserDB::new(user_id))
            .on_conflict_do_nothing()
            .execute(self.conn)
            .into_core()?;
        Ok(inserted > 0)
    }

    fn record_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        let row = TransactionDB::from(new);
        diesel::insert_into(transactions::table)
            .values(&row)
            .execute(self.conn)
            .into_core()?;
        Transaction::try_from(row)
    }

    fn balance_of(&mut self, user_id: &str, currency: &str) -> Result<Money> {
        let rows: Vec<(String, i64)> = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::currency.eq(currency))
            .select((transactions::kind, transactions::amount_minor))
            .load(self.conn)
            .into_core()?;

        // Summed in Rust rather than SQL so overflow is an error instead of
        // whatever the database decides.
        let mut balance = Money::zero(currency);
        for (kind, amount_minor) in rows {
            let kind = TransactionKind::from_str(&kind)?;
            let signed = Money::new(amount_minor, currency).checked_mul(kind.sign())?;
            balance = balance.checked_add(&signed)?;
        }
        Ok(balance)
    }

    fn record_order(&mut self, new: NewOrder) -> Result<Order> {
        let row = OrderDB::from(new);
        diesel::insert_into(orders::table)
            .values(&row)
            .execute(self.conn)
            .into_core()?;
        Order::try_from(row)
    }

    fn owned_securities(&mut self, user_id: &str) -> Result<Vec<OwnedSecurity>> {
        let rows: Vec<(String, String, i64, String, i64)> = orders::table
            .filter(orders::user_id.eq(user_id))
            .select((
                orders::security_name,
                orders::side,
                orders::security_price_minor,
                orders::currency,
                orders::quantity,
            ))
            .load(self.conn)
            .into_core()?;

        let mut by_name: BTreeMap<String, (i64, Money)> = BTreeMap::new();
        for (name, side, price_minor, currency, quantity) in rows {
            let row = PositionRowDB::parse(side, price_minor, currency, quantity)?;
            let signed_quantity = row.side.sign() * row.quantity;
            let signed_paid = row
                .security_price
                .checked_mul(row.quantity)?
                .checked_mul(row.side.sign())?;
            match by_name.get_mut(&name) {
                Some((quantity, paid)) => {
                    *quantity += signed_quantity;
                    *paid = paid.checked_add(&signed_paid)?;
                }
                None => {
                    by_name.insert(name, (signed_quantity, signed_paid));
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
        let rows: Vec<(String, i64)> = orders::table
            .filter(orders::user_id.eq(user_id))
            .filter(orders::security_name.eq(security_name))
            .select((orders::side, orders::quantity))
            .load(self.conn)
            .into_core()?;

        let mut net = 0i64;
        for (side, quantity) in rows {
            let side = paperfolio_core::ledger::OrderSide::from_str(&side)?;
            net += side.sign() * quantity;
        }
        Ok(net)
    }

    fn record_allowance_grant(&mut self, user_id: &str) -> Result<()> {
        diesel::insert_into(allowances::table)
            .values(AllowanceDB::new(user_id))
            .execute(self.conn)
            .into_core()?;
        Ok(())
    }

    fn eligible_for_allowance(&mut self) -> Result<Vec<String>> {
        let cutoff = format_timestamp(Utc::now() - Duration::days(ALLOWANCE_WINDOW_DAYS));

        // Users with no grant row newer than the cutoff. The timestamp
        // format sorts lexicographically, so text comparison is fine.
        users::table
            .left_join(
                allowances::table.on(allowances::user_id
                    .eq(users::id)
                    .and(allowances::created_at.gt(cutoff))),
            )
            .filter(allowances::id.is_null())
            .select(users::id)
            .order(users::id.asc())
            .load::<String>(self.conn)
            .into_core()
    }

    fn record_portfolio_snapshot(
        &mut self,
        user_id: &str,
        entries: &[PortfolioEntry],
    ) -> Result<()> {
        let row = SnapshotDB::new(user_id, entries)?;
        diesel::insert_into(portfolio_snapshots::table)
            .values(&row)
            .on_conflict((
                portfolio_snapshots::user_id,
                portfolio_snapshots::snapshot_date,
            ))
            .do_update()
            .set((
                portfolio_snapshots::entries.eq(&row.entries),
                portfolio_snapshots::created_at.eq(&row.created_at),
            ))
            .execute(self.conn)
            .into_core()?;
        Ok(())
    }

    fn portfolio_snapshots(&mut self, user_id: &str) -> Result<Vec<PortfolioSnapshot>> {
        let rows = portfolio_snapshots::table
            .filter(portfolio_snapshots::user_id.eq(user_id))
            .order(portfolio_snapshots::snapshot_date.asc())
            .select(SnapshotDB::as_select())
            .load::<SnapshotDB>(self.conn)
            .into_core()?;
        rows.into_iter().map(PortfolioSnapshot::try_from).collect()
    }

    fn all_user_ids(&mut self) -> Result<Vec<String>> {
        users::table
            .select(users::id)
            .order(users::id.asc())
            .load::<String>(self.conn)
            .into_core()
    }
}
