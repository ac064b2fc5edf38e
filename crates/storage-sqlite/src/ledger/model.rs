//! Database models for the ledger tables.
//!
//! Rows store money as integer minor units plus a currency code, enums as
//! their canonical strings and timestamps as formatted text. Conversions to
//! domain types are fallible because the text columns have to parse.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;
use uuid::Uuid;

use paperfolio_core::constants::{DATE_FORMAT, TIMESTAMP_FORMAT};
use paperfolio_core::ledger::{
    NewOrder, NewTransaction, Order, OrderSide, Transaction, TransactionKind,
};
use paperfolio_core::money::Money;
use paperfolio_core::portfolio::{PortfolioEntry, PortfolioSnapshot};
use paperfolio_core::{Error, Result};

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)?.and_utc())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserDB {
    pub id: String,
    pub created_at: String,
}

impl UserDB {
    pub fn new(user_id: &str) -> Self {
        Self {
            id: user_id.to_string(),
            created_at: format_timestamp(Utc::now()),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub comment: String,
    pub created_at: String,
}

impl From<NewTransaction> for TransactionDB {
    fn from(new: NewTransaction) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            kind: new.kind.as_str().to_string(),
            amount_minor: new.amount.minor(),
            currency: new.amount.currency().to_string(),
            comment: new.comment,
            created_at: format_timestamp(Utc::now()),
        }
    }
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = Error;

    fn try_from(db: TransactionDB) -> Result<Self> {
        Ok(Transaction {
            id: db.id,
            user_id: db.user_id,
            kind: TransactionKind::from_str(&db.kind)?,
            amount: Money::new(db.amount_minor, db.currency),
            comment: db.comment,
            created_at: parse_timestamp(&db.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderDB {
    pub id: String,
    pub user_id: String,
    pub transaction_id: String,
    pub side: String,
    pub security_name: String,
    pub security_price_minor: i64,
    pub currency: String,
    pub quantity: i64,
    pub created_at: String,
}

impl From<NewOrder> for OrderDB {
    fn from(new: NewOrder) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            transaction_id: new.transaction_id,
            side: new.side.as_str().to_string(),
            security_name: new.security_name,
            security_price_minor: new.security_price.minor(),
            currency: new.security_price.currency().to_string(),
            quantity: new.quantity,
            created_at: format_timestamp(Utc::now()),
        }
    }
}

impl TryFrom<OrderDB> for Order {
    type Error = Error;

    fn try_from(db: OrderDB) -> Result<Self> {
        Ok(Order {
            id: db.id,
            user_id: db.user_id,
            transaction_id: db.transaction_id,
            side: OrderSide::from_str(&db.side)?,
            security_name: db.security_name,
            security_price: Money::new(db.security_price_minor, db.currency),
            quantity: db.quantity,
            created_at: parse_timestamp(&db.created_at)?,
        })
    }
}

/// Per-order slice of a position, before aggregation into an owned security.
pub struct PositionRowDB {
    pub side: OrderSide,
    pub security_price: Money,
    pub quantity: i64,
}

impl PositionRowDB {
    pub fn parse(side: String, price_minor: i64, currency: String, quantity: i64) -> Result<Self> {
        Ok(Self {
            side: OrderSide::from_str(&side)?,
            security_price: Money::new(price_minor, currency),
            quantity,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::allowances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AllowanceDB {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
}

impl AllowanceDB {
    pub fn new(user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: format_timestamp(Utc::now()),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolio_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SnapshotDB {
    pub id: String,
    pub user_id: String,
    pub snapshot_date: String,
    pub entries: String,
    pub created_at: String,
}

impl SnapshotDB {
    pub fn new(user_id: &str, entries: &[PortfolioEntry]) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            snapshot_date: format_date(Utc::now().date_naive()),
            entries: serde_json::to_string(entries)?,
            created_at: format_timestamp(Utc::now()),
        })
    }
}

impl TryFrom<SnapshotDB> for PortfolioSnapshot {
    type Error = Error;

    fn try_from(db: SnapshotDB) -> Result<Self> {
        Ok(PortfolioSnapshot {
            created_at: parse_timestamp(&db.created_at)?,
            entries: serde_json::from_str(&db.entries)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn timestamps_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap()
            + Duration::microseconds(123_456);
        assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), ts);
    }

    #[test]
    fn timestamp_text_sorts_in_timestamp_order() {
        // A whole second must sort before the same second plus a fraction,
        // which only holds if the fractional part is fixed width.
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let fractional = whole + Duration::milliseconds(500);

        let a = format_timestamp(whole);
        let b = format_timestamp(fractional);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
