//! Error types for the Ronda framework.
//!
//! Structural input errors abort an analysis run immediately with the stage
//! and key that failed; per-period statistical insufficiency never raises and
//! instead degrades to `NaN` in the output tables.

use thiserror::Error;

use crate::types::{Date, Symbol};

/// The main error type for Ronda operations.
#[derive(Debug, Error)]
pub enum RondaError {
    /// Malformed or invalid input shape, types, or configuration.
    ///
    /// Raised at the boundary, before any computation proceeds.
    #[error("Schema violation: {0}")]
    Schema(String),

    /// A return computation encountered a zero or negative price.
    ///
    /// Fatal for that asset's return only; the forward-returns computer
    /// records the offending key and leaves `NaN` in the table rather than
    /// aborting the run.
    #[error("Invalid price for {symbol} on {date}: returns require strictly positive prices")]
    InvalidPrice {
        /// Observation date of the affected forward return.
        date: Date,
        /// Asset whose price was non-positive.
        symbol: Symbol,
    },

    /// The factor/forward-returns join produced zero rows.
    ///
    /// Always fatal: it indicates misaligned indices or disjoint date
    /// ranges between the factor series and the price panel.
    #[error(
        "Merging factor values with forward returns produced zero rows: \
         factor dates and price panel dates are likely disjoint"
    )]
    EmptyFactorData,

    /// Strict-mode grouping encountered an asset with no group mapping.
    #[error("No group mapping for {symbol} (strict grouping requested)")]
    MissingGroup {
        /// The unmapped asset.
        symbol: Symbol,
    },

    /// Strict-mode bucketing encountered a partition with too few distinct
    /// factor values.
    #[error(
        "Partition on {date} has {distinct} distinct factor values, \
         fewer than the {required} quantiles requested"
    )]
    InsufficientBreadth {
        /// Date of the degenerate partition.
        date: Date,
        /// Number of distinct factor values observed.
        distinct: usize,
        /// Number of quantile buckets requested.
        required: usize,
    },

    /// Error from Polars operations at the DataFrame boundary.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

/// A specialized Result type for Ronda operations.
pub type Result<T> = std::result::Result<T, RondaError>;
