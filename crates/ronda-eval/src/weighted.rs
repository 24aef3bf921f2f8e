//! Factor-weighted portfolio returns.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use ronda_traits::frame::date_column;
use ronda_traits::{Date, MergedFactorData, Result};

/// Per-period returns of a factor-weighted portfolio, one column per
/// horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorReturnsTable {
    dates: Vec<Date>,
    labels: Vec<String>,
    /// Row-major: `values[date_idx][horizon_idx]`.
    values: Vec<Vec<f64>>,
}

impl FactorReturnsTable {
    /// Dates, ascending.
    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Horizon labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Portfolio return at (date index, horizon index).
    #[must_use]
    pub fn get(&self, date_idx: usize, horizon_idx: usize) -> f64 {
        self.values[date_idx][horizon_idx]
    }

    /// The return time series for one horizon.
    #[must_use]
    pub fn series(&self, horizon_idx: usize) -> Vec<f64> {
        self.values.iter().map(|row| row[horizon_idx]).collect()
    }

    /// Render as a DataFrame: `date` plus one return column per horizon
    /// label.
    ///
    /// # Errors
    ///
    /// Returns [`ronda_traits::RondaError::Polars`] when column
    /// construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![date_column(&self.dates)?];
        for (idx, label) in self.labels.iter().enumerate() {
            columns.push(Column::new(label.as_str().into(), self.series(idx)));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Compute the per-period return of a portfolio weighted by the factor
/// itself.
///
/// Weights are proportional to the factor value — demeaned per date when
/// `long_short`, so positive-factor assets are held long and
/// negative-factor assets short — and normalized to unit gross exposure.
/// Rows with a missing forward return contribute nothing to that horizon.
/// Periods whose weights sum to zero gross exposure report `NaN`.
#[must_use]
pub fn factor_weighted_returns(data: &MergedFactorData, long_short: bool) -> FactorReturnsTable {
    let n_horizons = data.n_horizons();
    let mut dates = Vec::new();
    let mut values = Vec::new();

    for (date, rows) in data.partitions() {
        let mut weights: Vec<f64> = rows.iter().map(|r| r.factor).collect();
        if long_short {
            let mean = weights.iter().sum::<f64>() / weights.len() as f64;
            for w in &mut weights {
                *w -= mean;
            }
        }
        let gross: f64 = weights.iter().map(|w| w.abs()).sum();

        let row_values: Vec<f64> = if gross > 0.0 {
            (0..n_horizons)
                .map(|k| {
                    rows.iter()
                        .zip(weights.iter())
                        .filter(|(row, _)| row.returns[k].is_finite())
                        .map(|(row, w)| w / gross * row.returns[k])
                        .sum()
                })
                .collect()
        } else {
            vec![f64::NAN; n_horizons]
        };

        dates.push(date);
        values.push(row_values);
    }

    FactorReturnsTable {
        dates,
        labels: data.labels().to_vec(),
        values,
    }
}

/// Compound a per-period return series into cumulative returns.
///
/// `NaN` periods compound as zero return.
#[must_use]
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(returns.len());
    let mut acc = 0.0;
    for &r in returns {
        if r.is_finite() {
            acc = (1.0 + acc) * (1.0 + r) - 1.0;
        }
        cumulative.push(acc);
    }
    cumulative
}
