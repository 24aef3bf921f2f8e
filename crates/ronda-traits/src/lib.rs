#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core data model for the Ronda factor evaluation framework.
//!
//! This crate defines the tabular inputs an analysis run consumes
//! ([`PricePanel`], [`FactorSeries`], [`GroupingMap`], [`WeightSeries`]),
//! the canonical derived dataset every statistic is computed from
//! ([`MergedFactorData`]), the configuration surface ([`AnalysisConfig`])
//! and the error taxonomy ([`RondaError`]).
//!
//! All inputs are validated at construction: malformed shapes or types are
//! rejected with [`RondaError::Schema`] before any computation runs.

/// The version of the ronda-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod config;
pub mod dataset;
pub mod error;
pub mod factor;
pub mod frame;
pub mod groups;
pub mod panel;
pub mod types;

// Re-exports
pub use config::{AnalysisConfig, DemeanMode, QuantileSpec, ReturnAdjustment, WeightScheme};
pub use dataset::{MergedFactorData, MergedRow};
pub use error::{Result, RondaError};
pub use factor::{FactorObservation, FactorSeries};
pub use groups::{GroupingMap, WeightSeries};
pub use panel::PricePanel;
pub use types::{CE_TO_UNIX_EPOCH_DAYS, Date, Symbol};
