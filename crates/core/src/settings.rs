//! Engine configuration.

use crate::constants::DEFAULT_CURRENCY;
use crate::errors::{Result, ValidationError};
use crate::money::Money;

const STARTING_BALANCE_ENV: &str = "STARTING_BALANCE_CENTS";
const WEEKLY_ALLOWANCE_ENV: &str = "WEEKLY_ALLOWANCE_CENTS";
const CURRENCY_ENV: &str = "LEDGER_CURRENCY";

/// Configuration for the accounting engine.
#[derive(Debug, Clone)]
pub struct AccountingConfig {
    /// Currency every ledger amount is denominated in.
    pub currency: String,
    /// Credit granted when a user is first seen.
    pub starting_balance: Money,
    /// Credit granted by the weekly allowance.
    pub weekly_allowance: Money,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            starting_balance: Money::new(100_000, DEFAULT_CURRENCY),
            weekly_allowance: Money::new(10_000, DEFAULT_CURRENCY),
        }
    }
}

impl AccountingConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// unset variables. Set but unparsable values are an error rather than a
    /// silent default.
    pub fn from_env() -> Result<Self> {
        let currency =
            std::env::var(CURRENCY_ENV).unwrap_or_else(|_| DEFAULT_CURRENCY.to_string());
        let defaults = Self::default();

        let starting_balance = match read_cents(STARTING_BALANCE_ENV)? {
            Some(minor) => Money::new(minor, currency.clone()),
            None => Money::new(defaults.starting_balance.minor(), currency.clone()),
        };
        let weekly_allowance = match read_cents(WEEKLY_ALLOWANCE_ENV)? {
            Some(minor) => Money::new(minor, currency.clone()),
            None => Money::new(defaults.weekly_allowance.minor(), currency.clone()),
        };

        Ok(Self {
            currency,
            starting_balance,
            weekly_allowance,
        })
    }
}

fn read_cents(var: &str) -> Result<Option<i64>> {
    match std::env::var(var) {
        Ok(raw) => {
            let minor = raw.trim().parse::<i64>().map_err(|e| {
                ValidationError::InvalidInput(format!("{}='{}': {}", var, raw, e))
            })?;
            Ok(Some(minor))
        }
        Err(_) => Ok(None),
    }
}
