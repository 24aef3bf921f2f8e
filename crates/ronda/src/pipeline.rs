//! End-to-end analysis pipeline.

use serde::{Deserialize, Serialize};

use ronda_eval::{
    AutocorrelationTable, FactorReturnsTable, IcSummary, IcTable, QuantileReturnsTable,
    SpreadTable, TurnoverTable, factor_rank_autocorrelation, factor_weighted_returns,
    information_coefficient, mean_return_by_quantile, quantile_turnover,
};
use ronda_quantiles::{QuantileReport, assign_quantiles, merge_factor_data};
use ronda_returns::{Periodicity, PriceViolation, compute_forward_returns};
use ronda_traits::{
    AnalysisConfig, FactorSeries, GroupingMap, MergedFactorData, PricePanel, Result,
    WeightSeries,
};

/// Runs the full evaluation pipeline for one factor against one price
/// panel.
///
/// Stages, in order: forward returns (with periodicity inference), the
/// factor/returns merge, quantile bucketing, and the statistics suite.
/// All stages are pure functions of the inputs; a run never mutates them.
///
/// # Example
///
/// ```ignore
/// use ronda::{AnalysisConfig, FactorAnalyzer, QuantileSpec};
///
/// let analyzer = FactorAnalyzer::new(AnalysisConfig {
///     quantiles: QuantileSpec::Count(5),
///     horizons: vec![1, 5, 21],
///     ..Default::default()
/// })?;
/// let report = analyzer.run(&panel, &factor, None, None)?;
/// println!("mean 1D IC: {:.4}", report.ic_summary[0].mean_ic);
/// ```
#[derive(Debug, Clone)]
pub struct FactorAnalyzer {
    config: AnalysisConfig,
}

impl FactorAnalyzer {
    /// Create an analyzer with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ronda_traits::RondaError::Schema`] when the configuration
    /// is invalid.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this analyzer runs with.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the full pipeline.
    ///
    /// # Errors
    ///
    /// Propagates structural failures from any stage: schema violations,
    /// an empty join ([`ronda_traits::RondaError::EmptyFactorData`]), and
    /// the strict-mode grouping and breadth errors. Per-period statistical
    /// insufficiency does not fail the run; it shows up as `NaN` in the
    /// report's tables.
    pub fn run(
        &self,
        panel: &PricePanel,
        factor: &FactorSeries,
        groups: Option<&GroupingMap>,
        weights: Option<&WeightSeries>,
    ) -> Result<AnalysisReport> {
        let forward =
            compute_forward_returns(panel, &self.config.horizons, self.config.adjustment)?;
        let periodicity = forward.periodicity();
        let price_violations = forward.violations().to_vec();

        let mut data = merge_factor_data(factor, &forward, groups, weights, &self.config)?;
        let quantile_report = assign_quantiles(&mut data, &self.config)?;

        let ic = information_coefficient(&data);
        let ic_summary = ic.summary();
        let mean_returns = mean_return_by_quantile(&data)?;
        let spread = mean_returns.spread();
        let turnover = quantile_turnover(&data)?;
        let autocorrelation = factor_rank_autocorrelation(&data);
        let factor_returns = factor_weighted_returns(&data, true);

        Ok(AnalysisReport {
            periodicity,
            data,
            quantile_report,
            price_violations,
            mean_returns,
            spread,
            ic,
            ic_summary,
            turnover,
            autocorrelation,
            factor_returns,
        })
    }
}

/// Everything one analysis run produces.
///
/// The merged dataset and every table are owned values, recomputable from
/// the immutable inputs; reporting collaborators consume them through the
/// `to_dataframe` methods without knowing how they were computed.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Calendar granularity inferred from the price panel.
    pub periodicity: Periodicity,
    /// The labeled merged dataset all statistics derive from.
    pub data: MergedFactorData,
    /// Degenerate-partition flags from the bucketizer.
    pub quantile_report: QuantileReport,
    /// Non-positive-price diagnostics from the forward-return computer.
    pub price_violations: Vec<PriceViolation>,
    /// Weighted mean forward return per (date, quantile, horizon).
    pub mean_returns: QuantileReturnsTable,
    /// Top-minus-bottom quantile return spread per (date, horizon).
    pub spread: SpreadTable,
    /// Information coefficient per (date, horizon).
    pub ic: IcTable,
    /// Whole-period IC summary per horizon.
    pub ic_summary: Vec<IcSummary>,
    /// Bucket-membership turnover per (date, quantile).
    pub turnover: TurnoverTable,
    /// Factor rank autocorrelation per date.
    pub autocorrelation: AutocorrelationTable,
    /// Factor-weighted long-short portfolio return per (date, horizon).
    pub factor_returns: FactorReturnsTable,
}

/// Summary line for quick inspection of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDigest {
    /// Horizon label.
    pub label: String,
    /// Mean IC for the horizon.
    pub mean_ic: f64,
    /// Risk-adjusted IC for the horizon.
    pub risk_adjusted_ic: f64,
    /// Mean top-minus-bottom spread across periods with a defined spread.
    pub mean_spread: f64,
}

impl AnalysisReport {
    /// One digest line per horizon.
    #[must_use]
    pub fn digest(&self) -> Vec<ReportDigest> {
        self.ic_summary
            .iter()
            .enumerate()
            .map(|(idx, summary)| {
                let spreads: Vec<f64> = self
                    .spread
                    .series(idx)
                    .into_iter()
                    .filter(|s| s.is_finite())
                    .collect();
                let mean_spread = if spreads.is_empty() {
                    f64::NAN
                } else {
                    spreads.iter().sum::<f64>() / spreads.len() as f64
                };
                ReportDigest {
                    label: summary.label.clone(),
                    mean_ic: summary.mean_ic,
                    risk_adjusted_ic: summary.risk_adjusted_ic,
                    mean_spread,
                }
            })
            .collect()
    }
}
