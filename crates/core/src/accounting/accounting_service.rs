//! The accounting engine.
//!
//! Every operation opens at most a handful of short transactions against the
//! ledger store, reads what it needs, writes immutable facts and commits -
//! or fails with a typed error and writes nothing. Prices are fetched from
//! the oracle immediately before the transaction opens; the
//! correctness-critical validations (balance, held quantity) happen inside
//! the same transaction as the writes they guard.

use async_trait::async_trait;
use log::info;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::accounting_traits::{AccountingServiceTrait, CreateOrderRequest};
use crate::errors::{Error, Result, ValidationError};
use crate::ledger::{
    LedgerStore, NewOrder, NewTransaction, Order, OrderSide, TransactionKind,
};
use crate::money::Money;
use crate::portfolio::{value_holdings, PortfolioEntry, PortfolioSnapshot};
use crate::quotes::PriceOracleTrait;
use crate::settings::AccountingConfig;

/// Accounting engine over a ledger store and a price oracle.
///
/// Holds no state of its own across calls; all persisted state lives behind
/// the store.
pub struct AccountingService<S: LedgerStore> {
    store: Arc<S>,
    oracle: Arc<dyn PriceOracleTrait>,
    config: AccountingConfig,
}

impl<S: LedgerStore> AccountingService<S> {
    pub fn new(store: Arc<S>, oracle: Arc<dyn PriceOracleTrait>, config: AccountingConfig) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    fn validate_quantity(quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return Err(
                ValidationError::InvalidInput(format!("quantity must be positive, got {}", quantity))
                    .into(),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl<S: LedgerStore> AccountingServiceTrait for AccountingService<S> {
    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        let user_id = user_id.to_string();
        let starting_balance = self.config.starting_balance.clone();
        self.store
            .with_transaction(move |tx| {
                if tx.create_user(&user_id)? {
                    info!(
                        "New user {} onboarded, granting starting balance of {}",
                        user_id, starting_balance
                    );
                    tx.record_allowance_grant(&user_id)?;
                    tx.record_transaction(NewTransaction {
                        user_id: user_id.clone(),
                        kind: TransactionKind::Credit,
                        amount: starting_balance,
                        comment: "Initial credit".to_string(),
                    })?;
                }
                Ok(())
            })
            .await
    }

    async fn balance(&self, user_id: &str) -> Result<Money> {
        self.ensure_user(user_id).await?;
        let user_id = user_id.to_string();
        let currency = self.config.currency.clone();
        self.store
            .with_transaction(move |tx| tx.balance_of(&user_id, &currency))
            .await
    }

    async fn buy(&self, request: CreateOrderRequest) -> Result<Order> {
        Self::validate_quantity(request.quantity)?;
        self.ensure_user(&request.user_id).await?;

        let price = self.oracle.price(&request.security_name).await?;
        let cost = price.checked_mul(request.quantity)?;
        let currency = self.config.currency.clone();

        self.store
            .with_transaction(move |tx| {
                let balance = tx.balance_of(&request.user_id, &currency)?;
                if cost.checked_cmp(&balance)? == Ordering::Greater {
                    return Err(Error::InsufficientFunds {
                        available: balance,
                        required: cost,
                    });
                }
                let debit = tx.record_transaction(NewTransaction {
                    user_id: request.user_id.clone(),
                    kind: TransactionKind::Debit,
                    amount: cost,
                    comment: format!(
                        "Buy for {} of ${}",
                        request.quantity, request.security_name
                    ),
                })?;
                tx.record_order(NewOrder {
                    user_id: request.user_id,
                    transaction_id: debit.id,
                    side: OrderSide::Buy,
                    security_name: request.security_name,
                    security_price: price,
                    quantity: request.quantity,
                })
            })
            .await
    }

    async fn sell(&self, request: CreateOrderRequest) -> Result<Order> {
        Self::validate_quantity(request.quantity)?;
        self.ensure_user(&request.user_id).await?;

        let price = self.oracle.price(&request.security_name).await?;
        let proceeds = price.checked_mul(request.quantity)?;

        self.store
            .with_transaction(move |tx| {
                let held = tx.net_quantity(&request.user_id, &request.security_name)?;
                if held < request.quantity {
                    return Err(Error::InsufficientQuantity { available: held });
                }
                let credit = tx.record_transaction(NewTransaction {
                    user_id: request.user_id.clone(),
                    kind: TransactionKind::Credit,
                    amount: proceeds,
                    comment: format!(
                        "Sell for {} of ${}",
                        request.quantity, request.security_name
                    ),
                })?;
                tx.record_order(NewOrder {
                    user_id: request.user_id,
                    transaction_id: credit.id,
                    side: OrderSide::Sell,
                    security_name: request.security_name,
                    security_price: price,
                    quantity: request.quantity,
                })
            })
            .await
    }

    async fn portfolio(&self, user_id: &str) -> Result<Vec<PortfolioEntry>> {
        self.ensure_user(user_id).await?;
        let owner = user_id.to_string();
        let holdings = self
            .store
            .with_transaction(move |tx| tx.owned_securities(&owner))
            .await?;
        if holdings.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = holdings.iter().map(|h| h.name.clone()).collect();
        let prices = self.oracle.prices(&names).await?;
        value_holdings(&holdings, &prices)
    }

    async fn gift(&self, from_user_id: &str, to_user_id: &str, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(
                ValidationError::InvalidInput(format!("gift amount must be positive, got {}", amount))
                    .into(),
            );
        }
        // Onboarding is atomic and idempotent on its own, so doing it
        // outside the transfer transaction is safe.
        self.ensure_user(from_user_id).await?;
        self.ensure_user(to_user_id).await?;

        let from = from_user_id.to_string();
        let to = to_user_id.to_string();
        let currency = self.config.currency.clone();
        self.store
            .with_transaction(move |tx| {
                let balance = tx.balance_of(&from, &currency)?;
                if balance.checked_cmp(&amount)? == Ordering::Less {
                    return Err(Error::InsufficientFunds {
                        available: balance,
                        required: amount,
                    });
                }
                tx.record_transaction(NewTransaction {
                    user_id: from.clone(),
                    kind: TransactionKind::Debit,
                    amount: amount.clone(),
                    comment: format!("Gift to @{}", to),
                })?;
                tx.record_transaction(NewTransaction {
                    user_id: to.clone(),
                    kind: TransactionKind::Credit,
                    amount,
                    comment: format!("Gift from @{}", from),
                })?;
                Ok(())
            })
            .await
    }

    async fn disburse_allowances(&self) -> Result<usize> {
        info!("Granting user allowances");
        let allowance = self.config.weekly_allowance.clone();
        self.store
            .with_transaction(move |tx| {
                let user_ids = tx.eligible_for_allowance()?;
                for user_id in &user_ids {
                    tx.record_allowance_grant(user_id)?;
                    tx.record_transaction(NewTransaction {
                        user_id: user_id.clone(),
                        kind: TransactionKind::Credit,
                        amount: allowance.clone(),
                        comment: "Weekly allowance".to_string(),
                    })?;
                }
                Ok(user_ids.len())
            })
            .await
    }

    async fn capture_snapshots(&self) -> Result<usize> {
        info!("Taking portfolio snapshots");
        let names: Vec<String> = self
            .store
            .with_transaction(|tx| {
                let mut names = BTreeSet::new();
                for user_id in tx.all_user_ids()? {
                    for holding in tx.owned_securities(&user_id)? {
                        names.insert(holding.name);
                    }
                }
                Ok(names.into_iter().collect())
            })
            .await?;

        let prices = self.oracle.prices(&names).await?;

        // The valuation re-reads holdings inside the snapshot transaction;
        // a holding priced out from under us (added since the read above)
        // fails the valuation and rolls the whole batch back.
        self.store
            .with_transaction(move |tx| {
                let user_ids = tx.all_user_ids()?;
                for user_id in &user_ids {
                    let holdings = tx.owned_securities(user_id)?;
                    let entries = value_holdings(&holdings, &prices)?;
                    tx.record_portfolio_snapshot(user_id, &entries)?;
                }
                Ok(user_ids.len())
            })
            .await
    }

    async fn portfolio_history(&self, user_id: &str) -> Result<Vec<PortfolioSnapshot>> {
        let current = self.portfolio(user_id).await?;
        let owner = user_id.to_string();
        let mut snapshots = self
            .store
            .with_transaction(move |tx| tx.portfolio_snapshots(&owner))
            .await?;
        snapshots.push(PortfolioSnapshot {
            created_at: chrono::Utc::now(),
            entries: current,
        });
        Ok(snapshots)
    }
}
