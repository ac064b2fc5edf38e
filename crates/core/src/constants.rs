//! Shared constants for the ledger.

use std::time::Duration;

/// Number of fraction digits in a minor currency unit (cents).
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Decimal places kept when reporting a return rate.
pub const RETURN_RATE_PRECISION: u32 = 2;

/// A user is eligible for an allowance when no grant exists inside this
/// trailing window.
pub const ALLOWANCE_WINDOW_DAYS: i64 = 7;

/// How long a fetched price stays fresh before it is refetched.
pub const PRICE_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Timestamp format used for persisted rows. The fractional part is fixed
/// width so the text sorts lexicographically in timestamp order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Date format used for snapshot keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
