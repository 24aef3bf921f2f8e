//! Information coefficient: per-period rank correlation between factor
//! values and forward returns.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use ronda_traits::frame::date_column;
use ronda_traits::{Date, MergedFactorData, Result};

use crate::rank::spearman;

/// Per-period information coefficients, one column per horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcTable {
    dates: Vec<Date>,
    labels: Vec<String>,
    /// Row-major: `values[date_idx][horizon_idx]`.
    values: Vec<Vec<f64>>,
}

impl IcTable {
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

    /// IC at (date index, horizon index).
    #[must_use]
    pub fn get(&self, date_idx: usize, horizon_idx: usize) -> f64 {
        self.values[date_idx][horizon_idx]
    }

    /// The IC time series for one horizon.
    #[must_use]
    pub fn series(&self, horizon_idx: usize) -> Vec<f64> {
        self.values.iter().map(|row| row[horizon_idx]).collect()
    }

    /// Per-horizon summary statistics over the whole period.
    #[must_use]
    pub fn summary(&self) -> Vec<IcSummary> {
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, label)| IcSummary::from_series(label.clone(), &self.series(idx)))
            .collect()
    }

    /// Render as a DataFrame: `date` plus one IC column per horizon label.
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

/// Summary of an IC time series for one horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcSummary {
    /// Horizon label.
    pub label: String,
    /// Mean IC over periods with a defined IC.
    pub mean_ic: f64,
    /// Sample standard deviation of the IC series.
    pub ic_std: f64,
    /// Risk-adjusted IC: mean divided by standard deviation.
    pub risk_adjusted_ic: f64,
    /// Fraction of periods with positive IC.
    pub hit_rate: f64,
    /// Number of periods with a defined IC.
    pub n_obs: usize,
}

impl IcSummary {
    /// Summarize an IC series, ignoring `NaN` periods.
    #[must_use]
    pub fn from_series(label: String, series: &[f64]) -> Self {
        let valid: Vec<f64> = series.iter().copied().filter(|x| x.is_finite()).collect();
        let n_obs = valid.len();

        if n_obs == 0 {
            return Self {
                label,
                mean_ic: f64::NAN,
                ic_std: f64::NAN,
                risk_adjusted_ic: f64::NAN,
                hit_rate: f64::NAN,
                n_obs,
            };
        }

        let mean_ic = valid.iter().sum::<f64>() / n_obs as f64;
        let ic_std = if n_obs > 1 {
            let variance = valid.iter().map(|ic| (ic - mean_ic).powi(2)).sum::<f64>()
                / (n_obs - 1) as f64;
            variance.sqrt()
        } else {
            f64::NAN
        };
        let risk_adjusted_ic = if ic_std > 0.0 {
            mean_ic / ic_std
        } else {
            f64::NAN
        };
        let hit_rate = valid.iter().filter(|&&ic| ic > 0.0).count() as f64 / n_obs as f64;

        Self {
            label,
            mean_ic,
            ic_std,
            risk_adjusted_ic,
            hit_rate,
            n_obs,
        }
    }
}

/// Compute the per-period information coefficient for every horizon.
///
/// The IC at (date, horizon) is the Spearman rank correlation between
/// factor values and forward returns across the assets present that date.
/// Periods with fewer than two distinct factor values, or fewer than two
/// finite (factor, return) pairs, produce `NaN`.
#[must_use]
pub fn information_coefficient(data: &MergedFactorData) -> IcTable {
    let n_horizons = data.n_horizons();
    let mut dates = Vec::new();
    let mut values = Vec::new();

    for (date, rows) in data.partitions() {
        let factors: Vec<f64> = rows.iter().map(|r| r.factor).collect();
        let mut row_ics = Vec::with_capacity(n_horizons);
        for k in 0..n_horizons {
            let returns: Vec<f64> = rows.iter().map(|r| r.returns[k]).collect();
            row_ics.push(spearman(&factors, &returns));
        }
        dates.push(date);
        values.push(row_ics);
    }

    IcTable {
        dates,
        labels: data.labels().to_vec(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ronda_traits::MergedRow;

    fn date(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn row(day: u32, symbol: &str, factor: f64, returns: Vec<f64>) -> MergedRow {
        MergedRow {
            date: date(day),
            symbol: symbol.to_string(),
            factor,
            group: None,
            weight: 1.0,
            returns,
            quantile: None,
        }
    }

    fn dataset(rows: Vec<MergedRow>) -> MergedFactorData {
        MergedFactorData::new(vec![1, 5], vec!["1D".to_string(), "5D".to_string()], rows)
            .unwrap()
    }

    #[test]
    fn test_perfect_ic() {
        let data = dataset(vec![
            row(2, "A", 1.0, vec![0.01, 0.02]),
            row(2, "B", 2.0, vec![0.02, 0.04]),
            row(2, "C", 3.0, vec![0.03, 0.06]),
        ]);
        let ic = information_coefficient(&data);

        assert_eq!(ic.dates(), &[date(2)]);
        assert_relative_eq!(ic.get(0, 0), 1.0, max_relative = 1e-12);
        assert_relative_eq!(ic.get(0, 1), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_inverse_ic() {
        let data = dataset(vec![
            row(2, "A", 3.0, vec![0.01, 0.0]),
            row(2, "B", 2.0, vec![0.02, 0.0]),
            row(2, "C", 1.0, vec![0.03, 0.0]),
        ]);
        let ic = information_coefficient(&data);
        assert_relative_eq!(ic.get(0, 0), -1.0, max_relative = 1e-12);
        // Zero return variance on the second horizon.
        assert!(ic.get(0, 1).is_nan());
    }

    #[test]
    fn test_too_few_assets_is_nan() {
        let data = dataset(vec![row(2, "A", 1.0, vec![0.01, 0.02])]);
        let ic = information_coefficient(&data);
        assert!(ic.get(0, 0).is_nan());
    }

    #[test]
    fn test_constant_factor_is_nan() {
        let data = dataset(vec![
            row(2, "A", 1.0, vec![0.01, 0.0]),
            row(2, "B", 1.0, vec![0.02, 0.0]),
            row(2, "C", 1.0, vec![0.03, 0.0]),
        ]);
        let ic = information_coefficient(&data);
        assert!(ic.get(0, 0).is_nan());
    }

    #[test]
    fn test_summary() {
        let data = dataset(vec![
            row(2, "A", 1.0, vec![0.01, 0.02]),
            row(2, "B", 2.0, vec![0.02, 0.04]),
            row(3, "A", 1.0, vec![0.05, 0.01]),
            row(3, "B", 2.0, vec![0.06, 0.02]),
        ]);
        let summary = information_coefficient(&data).summary();

        assert_eq!(summary.len(), 2);
        let first = &summary[0];
        assert_eq!(first.label, "1D");
        assert_eq!(first.n_obs, 2);
        assert_relative_eq!(first.mean_ic, 1.0, max_relative = 1e-12);
        assert_relative_eq!(first.hit_rate, 1.0, max_relative = 1e-12);
        // Zero IC dispersion: risk-adjusted IC undefined.
        assert!(first.risk_adjusted_ic.is_nan());
    }

    #[test]
    fn test_summary_empty_series() {
        let summary = IcSummary::from_series("1D".to_string(), &[f64::NAN, f64::NAN]);
        assert_eq!(summary.n_obs, 0);
        assert!(summary.mean_ic.is_nan());
        assert!(summary.hit_rate.is_nan());
    }

    #[test]
    fn test_to_dataframe() {
        let data = dataset(vec![
            row(2, "A", 1.0, vec![0.01, 0.02]),
            row(2, "B", 2.0, vec![0.02, 0.04]),
        ]);
        let df = information_coefficient(&data).to_dataframe().unwrap();
        assert_eq!(df.height(), 1);
        assert!(df.column("1D").is_ok());
        assert!(df.column("5D").is_ok());
    }
}
