//! Mean forward returns by quantile bucket, and the top-minus-bottom
//! spread.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use ronda_traits::frame::date_column;
use ronda_traits::{Date, MergedFactorData, Result, RondaError};

/// Mean returns for one (date, quantile) cell, one entry per horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileReturnsRow {
    /// Period date.
    pub date: Date,
    /// Quantile bucket.
    pub quantile: u32,
    /// Weighted mean forward return per horizon; `NaN` for unpopulated
    /// buckets.
    pub means: Vec<f64>,
    /// Number of assets in the bucket this period.
    pub n_assets: usize,
}

/// Per-period weighted mean returns by quantile.
///
/// Every (date, quantile) pair in `[1, Q]` has a row; unpopulated buckets
/// carry `NaN`, never a fabricated zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileReturnsTable {
    labels: Vec<String>,
    quantile_count: u32,
    rows: Vec<QuantileReturnsRow>,
}

/// Whole-period aggregation of a quantile's per-date mean returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileAggregate {
    /// Quantile bucket.
    pub quantile: u32,
    /// Mean of per-date means, per horizon.
    pub mean: Vec<f64>,
    /// Sample standard deviation of per-date means, per horizon.
    pub std: Vec<f64>,
    /// Number of dates with a defined mean, per horizon.
    pub n_periods: Vec<usize>,
}

/// Per-period top-minus-bottom quantile return spread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadTable {
    dates: Vec<Date>,
    labels: Vec<String>,
    /// Row-major: `values[date_idx][horizon_idx]`.
    values: Vec<Vec<f64>>,
}

impl QuantileReturnsTable {
    /// All (date, quantile) rows, sorted by date then quantile.
    #[must_use]
    pub fn rows(&self) -> &[QuantileReturnsRow] {
        &self.rows
    }

    /// Horizon labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The requested bucket count.
    #[must_use]
    pub const fn quantile_count(&self) -> u32 {
        self.quantile_count
    }

    /// Per-period spread: mean return of bucket Q minus bucket 1.
    ///
    /// `NaN` whenever either endpoint bucket is empty that period.
    #[must_use]
    pub fn spread(&self) -> SpreadTable {
        let q = self.quantile_count;
        let mut dates = Vec::new();
        let mut values = Vec::new();

        for chunk in self.rows.chunks(q as usize) {
            let top = chunk.iter().find(|r| r.quantile == q);
            let bottom = chunk.iter().find(|r| r.quantile == 1);
            let spread: Vec<f64> = match (top, bottom) {
                (Some(top), Some(bottom)) => top
                    .means
                    .iter()
                    .zip(bottom.means.iter())
                    .map(|(t, b)| t - b)
                    .collect(),
                _ => vec![f64::NAN; self.labels.len()],
            };
            dates.push(chunk[0].date);
            values.push(spread);
        }

        SpreadTable {
            dates,
            labels: self.labels.clone(),
            values,
        }
    }

    /// Collapse dates into per-quantile mean/std/count of the per-date
    /// means.
    #[must_use]
    pub fn aggregate(&self) -> Vec<QuantileAggregate> {
        let n_horizons = self.labels.len();
        (1..=self.quantile_count)
            .map(|quantile| {
                let mut mean = Vec::with_capacity(n_horizons);
                let mut std = Vec::with_capacity(n_horizons);
                let mut n_periods = Vec::with_capacity(n_horizons);
                for k in 0..n_horizons {
                    let series: Vec<f64> = self
                        .rows
                        .iter()
                        .filter(|r| r.quantile == quantile)
                        .map(|r| r.means[k])
                        .filter(|m| m.is_finite())
                        .collect();
                    let n = series.len();
                    n_periods.push(n);
                    if n == 0 {
                        mean.push(f64::NAN);
                        std.push(f64::NAN);
                        continue;
                    }
                    let m = series.iter().sum::<f64>() / n as f64;
                    mean.push(m);
                    if n > 1 {
                        let var = series.iter().map(|x| (x - m).powi(2)).sum::<f64>()
                            / (n - 1) as f64;
                        std.push(var.sqrt());
                    } else {
                        std.push(f64::NAN);
                    }
                }
                QuantileAggregate {
                    quantile,
                    mean,
                    std,
                    n_periods,
                }
            })
            .collect()
    }

    /// Render as a DataFrame: `date`, `quantile`, `n_assets`, one mean
    /// column per horizon label.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Polars`] when column construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<Date> = self.rows.iter().map(|r| r.date).collect();
        let quantiles: Vec<u32> = self.rows.iter().map(|r| r.quantile).collect();
        let n_assets: Vec<u32> = self.rows.iter().map(|r| r.n_assets as u32).collect();

        let mut columns = vec![
            date_column(&dates)?,
            Column::new("quantile".into(), quantiles),
            Column::new("n_assets".into(), n_assets),
        ];
        for (idx, label) in self.labels.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|r| r.means[idx]).collect();
            columns.push(Column::new(label.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

impl SpreadTable {
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

    /// Spread at (date index, horizon index).
    #[must_use]
    pub fn get(&self, date_idx: usize, horizon_idx: usize) -> f64 {
        self.values[date_idx][horizon_idx]
    }

    /// The spread time series for one horizon.
    #[must_use]
    pub fn series(&self, horizon_idx: usize) -> Vec<f64> {
        self.values.iter().map(|row| row[horizon_idx]).collect()
    }

    /// Render as a DataFrame: `date` plus one spread column per horizon
    /// label.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Polars`] when column construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![date_column(&self.dates)?];
        for (idx, label) in self.labels.iter().enumerate() {
            columns.push(Column::new(label.as_str().into(), self.series(idx)));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Compute weighted mean forward returns per (date, quantile, horizon).
///
/// The mean over a bucket is `sum(w * r) / sum(w)` across rows with a
/// finite return; a bucket with no finite returns (or zero total weight)
/// reports `NaN`.
///
/// # Errors
///
/// Returns [`RondaError::Schema`] when quantile labels have not been
/// assigned yet.
pub fn mean_return_by_quantile(data: &MergedFactorData) -> Result<QuantileReturnsTable> {
    let quantile_count = data.quantile_count().ok_or_else(|| {
        RondaError::Schema(
            "quantile labels must be assigned before computing bucket returns".to_string(),
        )
    })?;
    let n_horizons = data.n_horizons();
    let mut rows = Vec::new();

    for (date, partition) in data.partitions() {
        for quantile in 1..=quantile_count {
            let bucket: Vec<_> = partition
                .iter()
                .filter(|r| r.quantile == Some(quantile))
                .collect();
            let mut means = Vec::with_capacity(n_horizons);
            for k in 0..n_horizons {
                let mut weighted_sum = 0.0;
                let mut weight_total = 0.0;
                for row in &bucket {
                    let r = row.returns[k];
                    if r.is_finite() {
                        weighted_sum += row.weight * r;
                        weight_total += row.weight;
                    }
                }
                if weight_total > 0.0 {
                    means.push(weighted_sum / weight_total);
                } else {
                    means.push(f64::NAN);
                }
            }
            rows.push(QuantileReturnsRow {
                date,
                quantile,
                means,
                n_assets: bucket.len(),
            });
        }
    }

    Ok(QuantileReturnsTable {
        labels: data.labels().to_vec(),
        quantile_count,
        rows,
    })
}
