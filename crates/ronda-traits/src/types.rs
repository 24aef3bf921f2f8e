//! Common types used throughout the Ronda framework.

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;
use chrono::Datelike;

/// A market symbol identifier.
///
/// Symbols identify assets across the framework, typically ticker symbols
/// like "AAPL" or "MSFT".
pub type Symbol = String;

/// Days between 0001-01-01 (chrono's common-era day zero) and the Unix epoch.
///
/// Polars stores `Date` columns as days since 1970-01-01; chrono counts from
/// the common era. This constant converts between the two.
pub const CE_TO_UNIX_EPOCH_DAYS: i32 = 719_163;

/// Convert a [`Date`] to days since the Unix epoch (polars `Date` encoding).
#[must_use]
pub fn to_epoch_days(date: Date) -> i32 {
    date.num_days_from_ce() - CE_TO_UNIX_EPOCH_DAYS
}

/// Convert days since the Unix epoch back to a [`Date`].
///
/// Returns `None` when the day count falls outside chrono's representable
/// range.
#[must_use]
pub fn from_epoch_days(days: i32) -> Option<Date> {
    Date::from_num_days_from_ce_opt(days + CE_TO_UNIX_EPOCH_DAYS)
}
