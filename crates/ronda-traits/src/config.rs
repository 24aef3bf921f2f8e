//! Configuration surface for a factor analysis run.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RondaError};

/// How quantile buckets are derived from factor values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantileSpec {
    /// Equal-count quantile bins, computed independently per partition.
    Count(u32),
    /// Explicit bin edges (ascending, at least two). Values are assigned to
    /// right-closed intervals; the lowest edge is inclusive. Rows outside
    /// the edge range stay unlabeled.
    Edges(Vec<f64>),
}

impl QuantileSpec {
    /// Number of buckets this spec produces when breadth is sufficient.
    #[must_use]
    pub fn bucket_count(&self) -> u32 {
        match self {
            Self::Count(q) => *q,
            Self::Edges(edges) => edges.len().saturating_sub(1) as u32,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Count(q) if *q < 2 => Err(RondaError::Schema(format!(
                "at least 2 quantile buckets are required, got {q}"
            ))),
            Self::Count(_) => Ok(()),
            Self::Edges(edges) => {
                if edges.len() < 2 {
                    return Err(RondaError::Schema(
                        "bin edges require at least 2 entries".to_string(),
                    ));
                }
                if edges.iter().any(|e| !e.is_finite()) {
                    return Err(RondaError::Schema(
                        "bin edges must be finite".to_string(),
                    ));
                }
                if edges.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(RondaError::Schema(
                        "bin edges must be strictly increasing".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Rescaling applied to forward returns to put horizons on a common basis.
///
/// The rescaling exponent is `basis / h` for horizon `h`: one period for
/// [`ReturnAdjustment::PerPeriod`], the periodicity's periods-per-year for
/// [`ReturnAdjustment::Annualized`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnAdjustment {
    /// Leave raw cumulative returns untouched.
    #[default]
    None,
    /// Convert each horizon to an equivalent one-period rate.
    PerPeriod,
    /// Convert each horizon to an annualized rate.
    Annualized,
}

/// Cross-sectional demeaning applied to forward returns during the merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemeanMode {
    /// No demeaning.
    #[default]
    None,
    /// Subtract the per-date mean across the whole universe.
    Universe,
    /// Subtract the per-date mean within each group.
    Group,
}

/// Weighting applied when averaging returns within a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightScheme {
    /// Every asset weighs the same.
    #[default]
    Equal,
    /// Use the caller-supplied [`WeightSeries`](crate::WeightSeries).
    Supplied,
}

/// Configuration for a factor analysis run.
///
/// # Example
///
/// ```
/// use ronda_traits::{AnalysisConfig, QuantileSpec};
///
/// let config = AnalysisConfig {
///     quantiles: QuantileSpec::Count(5),
///     horizons: vec![1, 5, 21],
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Quantile bucket specification.
    pub quantiles: QuantileSpec,
    /// Forward-return horizons, in trading periods.
    pub horizons: Vec<usize>,
    /// Periodicity adjustment applied to forward returns.
    pub adjustment: ReturnAdjustment,
    /// Compute quantile buckets per (date, group) instead of per date.
    pub by_group: bool,
    /// With `by_group`, derive bucket edges from the pooled date partition
    /// and apply them within each group, instead of bucketing each group
    /// independently.
    pub pooled_edges: bool,
    /// Cross-sectional demeaning of forward returns.
    pub demean: DemeanMode,
    /// Weighting used for bucket mean returns.
    pub weighting: WeightScheme,
    /// Drop rows where any horizon return is missing, not just all.
    pub drop_partial_horizons: bool,
    /// Keep rows whose horizon returns are all missing instead of dropping
    /// them.
    pub keep_unmatched_rows: bool,
    /// Fail with `InsufficientBreadth` on partitions with fewer distinct
    /// factor values than buckets, instead of collapsing.
    pub strict_breadth: bool,
    /// Fail with `MissingGroup` on assets absent from the grouping map,
    /// instead of labeling them "Unknown".
    pub strict_groups: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            quantiles: QuantileSpec::Count(5),
            horizons: vec![1, 5, 10],
            adjustment: ReturnAdjustment::None,
            by_group: false,
            pooled_edges: false,
            demean: DemeanMode::None,
            weighting: WeightScheme::Equal,
            drop_partial_horizons: false,
            keep_unmatched_rows: false,
            strict_breadth: false,
            strict_groups: false,
        }
    }
}

impl AnalysisConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] when horizons are empty, zero, or
    /// duplicated, or when the quantile spec is malformed.
    pub fn validate(&self) -> Result<()> {
        if self.horizons.is_empty() {
            return Err(RondaError::Schema(
                "at least one forward-return horizon is required".to_string(),
            ));
        }
        if self.horizons.contains(&0) {
            return Err(RondaError::Schema(
                "horizons must be positive".to_string(),
            ));
        }
        let mut sorted = self.horizons.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.horizons.len() {
            return Err(RondaError::Schema(
                "horizons must be unique".to_string(),
            ));
        }
        self.quantiles.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_horizons() {
        let config = AnalysisConfig {
            horizons: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_horizon() {
        let config = AnalysisConfig {
            horizons: vec![1, 0],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_horizons() {
        let config = AnalysisConfig {
            horizons: vec![5, 5],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_single_bucket() {
        let config = AnalysisConfig {
            quantiles: QuantileSpec::Count(1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unsorted_edges() {
        let config = AnalysisConfig {
            quantiles: QuantileSpec::Edges(vec![0.0, 2.0, 1.0]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_edges_bucket_count() {
        let spec = QuantileSpec::Edges(vec![-1.0, 0.0, 1.0]);
        assert_eq!(spec.bucket_count(), 2);
    }
}
