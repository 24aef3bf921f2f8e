#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # ronda
//!
//! Cross-sectional alpha factor evaluation.
//!
//! Ronda measures whether a trading signal has exploitable predictive
//! power. Given a price panel and a time-indexed, asset-indexed series of
//! factor values, it computes forward returns over multiple horizons,
//! partitions assets into factor-ranked quantile buckets per period, and
//! derives the statistics used to judge the factor: information
//! coefficient, quantile-spread returns, bucket turnover, and factor rank
//! autocorrelation.
//!
//! ## Quick start
//!
//! ```ignore
//! use ronda::{AnalysisConfig, FactorAnalyzer, FactorSeries, PricePanel, QuantileSpec};
//!
//! let panel = PricePanel::from_dataframe(&prices)?;
//! let factor = FactorSeries::from_dataframe(&scores)?;
//!
//! let analyzer = FactorAnalyzer::new(AnalysisConfig {
//!     quantiles: QuantileSpec::Count(5),
//!     horizons: vec![1, 5, 21],
//!     ..Default::default()
//! })?;
//!
//! let report = analyzer.run(&panel, &factor, None, None)?;
//! for digest in report.digest() {
//!     println!(
//!         "{}: IC {:.4}, spread {:.4}",
//!         digest.label, digest.mean_ic, digest.mean_spread
//!     );
//! }
//! ```
//!
//! ## Crate organization
//!
//! - [`traits`] - the shared data model, configuration, and errors
//! - [`returns`] - calendar resolution and forward-return computation
//! - [`quantiles`] - factor/returns alignment and quantile bucketing
//! - [`eval`] - the statistics engine
//!
//! Data flows strictly downward: raw panels are merged and bucketed into
//! one canonical dataset, and every statistic derives from it. No stage
//! mutates another's inputs.

/// Version information for the ronda crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod pipeline;

pub use pipeline::{AnalysisReport, FactorAnalyzer, ReportDigest};

/// Core data model: panels, factor series, configuration, and errors.
pub mod traits {
    pub use ronda_traits::*;
}

/// Calendar resolution and forward-return computation.
pub mod returns {
    pub use ronda_returns::*;
}

/// Factor/returns alignment and quantile bucketing.
pub mod quantiles {
    pub use ronda_quantiles::*;
}

/// The statistics engine.
pub mod eval {
    pub use ronda_eval::*;
}

// Flat re-exports of the types most callers touch.
pub use ronda_eval::{
    AutocorrelationTable, FactorReturnsTable, IcSummary, IcTable, QuantileAggregate,
    QuantileReturnsTable, SpreadTable, TurnoverTable,
};
pub use ronda_quantiles::{DegeneratePartition, QuantileReport};
pub use ronda_returns::{ForwardReturns, Periodicity, PriceViolation};
pub use ronda_traits::{
    AnalysisConfig, Date, DemeanMode, FactorObservation, FactorSeries, GroupingMap,
    MergedFactorData, MergedRow, PricePanel, QuantileSpec, Result, ReturnAdjustment,
    RondaError, Symbol, WeightScheme, WeightSeries,
};
