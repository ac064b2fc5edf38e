//! Ledger domain models.
//!
//! Transactions and orders are immutable facts; every derived view (cash
//! balance, net quantity, owned securities) is a signed aggregation over
//! them and is never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use crate::money::Money;

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "CREDIT",
            TransactionKind::Debit => "DEBIT",
        }
    }

    /// Sign applied when summing amounts into a balance.
    pub fn sign(&self) -> i64 {
        match self {
            TransactionKind::Credit => 1,
            TransactionKind::Debit => -1,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(TransactionKind::Credit),
            "DEBIT" => Ok(TransactionKind::Debit),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown transaction kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    /// Sign applied when summing quantities into a net position.
    pub fn sign(&self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

impl FromStr for OrderSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown order side '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable cash movement. The signed sum of a user's transactions IS
/// the user's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: Money,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a transaction; id and timestamp are assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: Money,
    pub comment: String,
}

/// An immutable executed order, linked to the cash transaction that paid for
/// (or was funded by) it. `security_price` is the unit price at execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub transaction_id: String,
    pub side: OrderSide,
    pub security_name: String,
    pub security_price: Money,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub transaction_id: String,
    pub side: OrderSide,
    pub security_name: String,
    pub security_price: Money,
    pub quantity: i64,
}

/// A currently-held security, aggregated from orders. Only positions with
/// positive net quantity are reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedSecurity {
    pub name: String,
    pub quantity: i64,
    pub total_price_paid: Money,
}
