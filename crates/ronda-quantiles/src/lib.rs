#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Factor/forward-return alignment and quantile bucketing.
//!
//! [`merge_factor_data`] joins a factor series with its forward returns,
//! group labels, and weights into the canonical
//! [`MergedFactorData`](ronda_traits::MergedFactorData);
//! [`assign_quantiles`] then labels every row with its factor-ranked
//! bucket. Together they form the alignment engine every downstream
//! statistic is computed from.

pub mod buckets;
pub mod merge;

// Re-export main types
pub use buckets::{DegeneratePartition, QuantileReport, assign_quantiles};
pub use merge::merge_factor_data;
