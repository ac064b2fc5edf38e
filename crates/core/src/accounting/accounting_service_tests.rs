use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::accounting::{AccountingService, AccountingServiceTrait, CreateOrderRequest};
use crate::errors::{Error, Result};
use crate::ledger::{LedgerStore, MemoryLedger, OrderSide};
use crate::money::Money;
use crate::quotes::PriceOracleTrait;
use crate::settings::AccountingConfig;

// --- Mock price oracle ---

struct StaticOracle {
    prices: Mutex<HashMap<String, Money>>,
}

impl StaticOracle {
    fn new(prices: &[(&str, i64)]) -> Arc<Self> {
        Arc::new(Self {
            prices: Mutex::new(
                prices
                    .iter()
                    .map(|(name, minor)| (name.to_string(), Money::new(*minor, "USD")))
                    .collect(),
            ),
        })
    }

    fn set_price(&self, name: &str, minor: i64) {
        self.prices
            .lock()
            .unwrap()
            .insert(name.to_string(), Money::new(minor, "USD"));
    }
}

#[async_trait]
impl PriceOracleTrait for StaticOracle {
    async fn price(&self, symbol: &str) -> Result<Money> {
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::PriceUnavailable(symbol.to_string()))
    }

    async fn prices(&self, symbols: &[String]) -> Result<HashMap<String, Money>> {
        let mut out = HashMap::new();
        for symbol in symbols {
            out.insert(symbol.clone(), self.price(symbol).await?);
        }
        Ok(out)
    }
}

/// Oracle that always fails, for rollback tests.
struct DownOracle;

#[async_trait]
impl PriceOracleTrait for DownOracle {
    async fn price(&self, symbol: &str) -> Result<Money> {
        Err(Error::PriceUnavailable(symbol.to_string()))
    }

    async fn prices(&self, symbols: &[String]) -> Result<HashMap<String, Money>> {
        Err(Error::PriceUnavailable(symbols.join(", ")))
    }
}

// --- Helpers ---

fn config() -> AccountingConfig {
    AccountingConfig {
        currency: "USD".to_string(),
        starting_balance: Money::new(100_000, "USD"),
        weekly_allowance: Money::new(10_000, "USD"),
    }
}

fn service_with(
    store: Arc<MemoryLedger>,
    oracle: Arc<dyn PriceOracleTrait>,
) -> AccountingService<MemoryLedger> {
    AccountingService::new(store, oracle, config())
}

fn service(prices: &[(&str, i64)]) -> AccountingService<MemoryLedger> {
    service_with(Arc::new(MemoryLedger::new()), StaticOracle::new(prices))
}

fn usd(minor: i64) -> Money {
    Money::new(minor, "USD")
}

fn order(user: &str, security: &str, quantity: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: user.to_string(),
        security_name: security.to_string(),
        quantity,
    }
}

async fn stored_quantity(store: &MemoryLedger, user: &str, security: &str) -> i64 {
    let user = user.to_string();
    let security = security.to_string();
    store
        .with_transaction(move |tx| tx.net_quantity(&user, &security))
        .await
        .unwrap()
}

// --- Onboarding ---

#[tokio::test]
async fn onboarding_credits_starting_balance_once() {
    let engine = service(&[]);
    engine.ensure_user("alice").await.unwrap();
    engine.ensure_user("alice").await.unwrap();
    assert_eq!(engine.balance("alice").await.unwrap(), usd(100_000));
}

#[tokio::test]
async fn onboarding_grant_blocks_immediate_allowance() {
    let engine = service(&[]);
    engine.ensure_user("alice").await.unwrap();

    // The onboarding grant is inside the 7-day window, so the scheduled
    // disbursement must skip the user.
    assert_eq!(engine.disburse_allowances().await.unwrap(), 0);
    assert_eq!(engine.balance("alice").await.unwrap(), usd(100_000));
}

// --- Buy (Scenario A) ---

#[tokio::test]
async fn buy_debits_cost_and_records_order() {
    let engine = service(&[("ACME", 5_000)]);

    let order = engine.buy(order("alice", "ACME", 10)).await.unwrap();

    assert_eq!(order.side, OrderSide::Buy);
    assert_eq!(order.security_name, "ACME");
    assert_eq!(order.security_price, usd(5_000));
    assert_eq!(order.quantity, 10);
    assert!(!order.transaction_id.is_empty());
    // $1000.00 - 10 x $50.00 = $500.00
    assert_eq!(engine.balance("alice").await.unwrap(), usd(50_000));
}

#[tokio::test]
async fn buy_beyond_balance_fails_without_writes() {
    let engine = service(&[("ACME", 5_000)]);

    let err = engine.buy(order("alice", "ACME", 100)).await.unwrap_err();
    match err {
        Error::InsufficientFunds {
            available,
            required,
        } => {
            assert_eq!(available, usd(100_000));
            assert_eq!(required, usd(500_000));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    assert_eq!(engine.balance("alice").await.unwrap(), usd(100_000));
}

#[tokio::test]
async fn buy_with_oracle_down_leaves_no_rows() {
    let store = Arc::new(MemoryLedger::new());
    let engine = service_with(store.clone(), Arc::new(DownOracle));

    let err = engine.buy(order("alice", "ACME", 10)).await.unwrap_err();
    assert!(matches!(err, Error::PriceUnavailable(_)));

    // The user was onboarded, but no transaction or order exists for the
    // failed attempt.
    assert_eq!(stored_quantity(&store, "alice", "ACME").await, 0);
    let balance = store
        .with_transaction(|tx| tx.balance_of("alice", "USD"))
        .await
        .unwrap();
    assert_eq!(balance, usd(100_000));
}

#[tokio::test]
async fn buy_rejects_non_positive_quantity() {
    let engine = service(&[("ACME", 5_000)]);
    assert!(matches!(
        engine.buy(order("alice", "ACME", 0)).await.unwrap_err(),
        Error::Validation(_)
    ));
}

// --- Sell (Scenario C) ---

#[tokio::test]
async fn sell_credits_proceeds_at_current_price() {
    let store = Arc::new(MemoryLedger::new());
    let oracle = StaticOracle::new(&[("ACME", 5_000)]);
    let engine = service_with(store.clone(), oracle.clone());

    engine.buy(order("alice", "ACME", 10)).await.unwrap();
    oracle.set_price("ACME", 6_000);
    let sale = engine.sell(order("alice", "ACME", 10)).await.unwrap();

    assert_eq!(sale.side, OrderSide::Sell);
    assert_eq!(sale.security_price, usd(6_000));
    // $1000 - $500 + $600 = $1100
    assert_eq!(engine.balance("alice").await.unwrap(), usd(110_000));
    assert_eq!(stored_quantity(&store, "alice", "ACME").await, 0);
}

#[tokio::test]
async fn oversell_fails_and_leaves_holdings_unchanged() {
    let store = Arc::new(MemoryLedger::new());
    let engine = service_with(store.clone(), StaticOracle::new(&[("ACME", 5_000)]));

    engine.buy(order("alice", "ACME", 10)).await.unwrap();
    let err = engine.sell(order("alice", "ACME", 15)).await.unwrap_err();

    match err {
        Error::InsufficientQuantity { available } => assert_eq!(available, 10),
        other => panic!("expected InsufficientQuantity, got {:?}", other),
    }
    assert_eq!(stored_quantity(&store, "alice", "ACME").await, 10);
    assert_eq!(engine.balance("alice").await.unwrap(), usd(50_000));
}

// --- Portfolio (Scenario B) ---

#[tokio::test]
async fn portfolio_values_holdings_at_current_price() {
    let oracle = StaticOracle::new(&[("ACME", 5_000)]);
    let engine = service_with(Arc::new(MemoryLedger::new()), oracle.clone());

    engine.buy(order("alice", "ACME", 10)).await.unwrap();
    oracle.set_price("ACME", 6_000);

    let portfolio = engine.portfolio("alice").await.unwrap();
    assert_eq!(portfolio.len(), 1);
    let entry = &portfolio[0];
    assert_eq!(entry.security_name, "ACME");
    assert_eq!(entry.quantity, 10);
    assert_eq!(entry.total_price_paid, usd(50_000));
    assert_eq!(entry.balance, usd(60_000));
    assert_eq!(entry.return_rate, dec!(20.00));
}

#[tokio::test]
async fn empty_portfolio_needs_no_prices() {
    let engine = service_with(Arc::new(MemoryLedger::new()), Arc::new(DownOracle));
    // The oracle is down, but a user with no holdings still gets an answer.
    assert!(engine.portfolio("alice").await.unwrap().is_empty());
}

// --- Gift (Scenario D) ---

#[tokio::test]
async fn gift_moves_money_exactly() {
    let engine = service(&[]);
    engine.ensure_user("a").await.unwrap();
    engine.ensure_user("b").await.unwrap();

    engine.gift("a", "b", usd(5_000)).await.unwrap();

    assert_eq!(engine.balance("a").await.unwrap(), usd(95_000));
    assert_eq!(engine.balance("b").await.unwrap(), usd(105_000));
}

#[tokio::test]
async fn gift_beyond_balance_fails_with_detail() {
    let engine = service(&[]);
    engine.ensure_user("a").await.unwrap();
    engine.ensure_user("b").await.unwrap();

    let err = engine.gift("a", "b", usd(200_000)).await.unwrap_err();
    match err {
        Error::InsufficientFunds {
            available,
            required,
        } => {
            assert_eq!(available, usd(100_000));
            assert_eq!(required, usd(200_000));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    // Neither side changed.
    assert_eq!(engine.balance("a").await.unwrap(), usd(100_000));
    assert_eq!(engine.balance("b").await.unwrap(), usd(100_000));
}

#[tokio::test]
async fn gift_rejects_non_positive_amount() {
    let engine = service(&[]);
    assert!(matches!(
        engine.gift("a", "b", usd(0)).await.unwrap_err(),
        Error::Validation(_)
    ));
}

// --- Allowances (Scenario E) ---

#[tokio::test]
async fn disbursement_grants_at_most_once_per_window() {
    let store = Arc::new(MemoryLedger::new());
    let engine = service_with(store.clone(), StaticOracle::new(&[]));

    // A user created without the onboarding grant is immediately eligible.
    store
        .with_transaction(|tx| tx.create_user("legacy").map(|_| ()))
        .await
        .unwrap();

    assert_eq!(engine.disburse_allowances().await.unwrap(), 1);
    let balance = store
        .with_transaction(|tx| tx.balance_of("legacy", "USD"))
        .await
        .unwrap();
    assert_eq!(balance, usd(10_000));

    // A second run inside the same window grants nothing.
    assert_eq!(engine.disburse_allowances().await.unwrap(), 0);
    let balance = store
        .with_transaction(|tx| tx.balance_of("legacy", "USD"))
        .await
        .unwrap();
    assert_eq!(balance, usd(10_000));
}

// --- Snapshots & history ---

#[tokio::test]
async fn snapshots_capture_every_user_and_rerun_is_idempotent() {
    let oracle = StaticOracle::new(&[("ACME", 5_000)]);
    let store = Arc::new(MemoryLedger::new());
    let engine = service_with(store.clone(), oracle.clone());

    engine.buy(order("alice", "ACME", 10)).await.unwrap();
    engine.ensure_user("bob").await.unwrap();

    assert_eq!(engine.capture_snapshots().await.unwrap(), 2);
    // Same-day rerun rewrites rather than duplicates.
    assert_eq!(engine.capture_snapshots().await.unwrap(), 2);

    let stored = store
        .with_transaction(|tx| tx.portfolio_snapshots("alice"))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].entries.len(), 1);
    assert_eq!(stored[0].entries[0].balance, usd(50_000));

    // A user with no holdings still gets an (empty) daily snapshot.
    let stored = store
        .with_transaction(|tx| tx.portfolio_snapshots("bob"))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].entries.is_empty());
}

#[tokio::test]
async fn snapshot_batch_is_all_or_nothing() {
    let oracle = StaticOracle::new(&[("ACME", 5_000)]);
    let store = Arc::new(MemoryLedger::new());
    let engine = service_with(store.clone(), oracle.clone());
    engine.buy(order("alice", "ACME", 10)).await.unwrap();

    // Price disappears before the capture runs.
    let broken = service_with(store.clone(), Arc::new(DownOracle));
    assert!(broken.capture_snapshots().await.is_err());

    let stored = store
        .with_transaction(|tx| tx.portfolio_snapshots("alice"))
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn history_appends_current_portfolio_as_trailing_entry() {
    let oracle = StaticOracle::new(&[("ACME", 5_000)]);
    let store = Arc::new(MemoryLedger::new());
    let engine = service_with(store.clone(), oracle.clone());

    engine.buy(order("alice", "ACME", 10)).await.unwrap();
    engine.capture_snapshots().await.unwrap();
    oracle.set_price("ACME", 6_000);

    let history = engine.portfolio_history("alice").await.unwrap();
    assert_eq!(history.len(), 2);
    // Stored snapshot at the old price, synthetic current one at the new.
    assert_eq!(history[0].entries[0].balance, usd(50_000));
    assert_eq!(history[1].entries[0].balance, usd(60_000));
    assert!(history[0].created_at <= history[1].created_at);
}

#[tokio::test]
async fn history_with_no_stored_snapshots_is_a_single_point() {
    let engine = service(&[("ACME", 5_000)]);
    engine.buy(order("alice", "ACME", 1)).await.unwrap();

    let history = engine.portfolio_history("alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entries[0].balance, usd(5_000));
}
