#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Statistics engine for the Ronda framework.
//!
//! Every statistic consumes the labeled
//! [`MergedFactorData`](ronda_traits::MergedFactorData) and is computed
//! per period (grouped by date). Per-period insufficiency — too few
//! assets, an empty bucket, zero variance — degrades to `NaN` in the
//! output tables; it never raises.

pub mod ic;
pub mod quantile_returns;
pub mod rank;
pub mod turnover;
pub mod weighted;

// Re-export main types
pub use ic::{IcSummary, IcTable, information_coefficient};
pub use quantile_returns::{
    QuantileAggregate, QuantileReturnsRow, QuantileReturnsTable, SpreadTable,
    mean_return_by_quantile,
};
pub use rank::{average_ranks, spearman};
pub use turnover::{
    AutocorrelationTable, TurnoverTable, factor_rank_autocorrelation, quantile_turnover,
};
pub use weighted::{FactorReturnsTable, cumulative_returns, factor_weighted_returns};
