//! Bucket-membership churn and factor rank persistence.

use std::collections::HashMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use ronda_traits::frame::date_column;
use ronda_traits::{Date, MergedFactorData, Result, RondaError};

use crate::rank::spearman;

/// Per-period bucket turnover, one column per quantile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnoverTable {
    dates: Vec<Date>,
    quantile_count: u32,
    /// Row-major: `values[date_idx][quantile_idx]`.
    values: Vec<Vec<f64>>,
}

impl TurnoverTable {
    /// Dates, ascending. The first date has no predecessor and reports
    /// `NaN`.
    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// The requested bucket count.
    #[must_use]
    pub const fn quantile_count(&self) -> u32 {
        self.quantile_count
    }

    /// Turnover at (date index, quantile). Quantiles are 1-based.
    #[must_use]
    pub fn get(&self, date_idx: usize, quantile: u32) -> f64 {
        self.values[date_idx][(quantile - 1) as usize]
    }

    /// The turnover time series for one quantile (1-based).
    #[must_use]
    pub fn series(&self, quantile: u32) -> Vec<f64> {
        self.values
            .iter()
            .map(|row| row[(quantile - 1) as usize])
            .collect()
    }

    /// Render as a DataFrame: `date` plus one column per quantile,
    /// labeled `q1`, `q2`, ...
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Polars`] when column construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![date_column(&self.dates)?];
        for quantile in 1..=self.quantile_count {
            columns.push(Column::new(
                format!("q{quantile}").into(),
                self.series(quantile),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Per-period rank autocorrelation of factor values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocorrelationTable {
    dates: Vec<Date>,
    values: Vec<f64>,
}

impl AutocorrelationTable {
    /// Dates, ascending. The first date reports `NaN`.
    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Autocorrelation values, aligned with [`dates`](Self::dates).
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Render as a DataFrame: `date`, `autocorrelation`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Polars`] when column construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            date_column(&self.dates)?,
            Column::new("autocorrelation".into(), self.values.clone()),
        ])?)
    }
}

/// Compute per-period bucket turnover.
///
/// Turnover at (date, quantile) is the fraction of the bucket's assets
/// that were present the previous period but sat in a different bucket
/// then. Assets absent from the previous period are excluded from the
/// denominator entirely, so universe churn is not mistaken for bucket
/// churn. An empty denominator, and the first period, report `NaN`.
///
/// # Errors
///
/// Returns [`RondaError::Schema`] when quantile labels have not been
/// assigned yet.
pub fn quantile_turnover(data: &MergedFactorData) -> Result<TurnoverTable> {
    let quantile_count = data.quantile_count().ok_or_else(|| {
        RondaError::Schema(
            "quantile labels must be assigned before computing turnover".to_string(),
        )
    })?;

    let mut dates = Vec::new();
    let mut values = Vec::new();
    let mut previous: Option<HashMap<&str, u32>> = None;

    for (date, rows) in data.partitions() {
        let membership: HashMap<&str, u32> = rows
            .iter()
            .filter_map(|r| r.quantile.map(|q| (r.symbol.as_str(), q)))
            .collect();

        let row_values = match &previous {
            None => vec![f64::NAN; quantile_count as usize],
            Some(prev) => (1..=quantile_count)
                .map(|quantile| {
                    let mut stayed = 0usize;
                    let mut comparable = 0usize;
                    for (symbol, &q) in &membership {
                        if q != quantile {
                            continue;
                        }
                        if let Some(&prev_q) = prev.get(symbol) {
                            comparable += 1;
                            if prev_q == quantile {
                                stayed += 1;
                            }
                        }
                    }
                    if comparable == 0 {
                        f64::NAN
                    } else {
                        (comparable - stayed) as f64 / comparable as f64
                    }
                })
                .collect(),
        };

        dates.push(date);
        values.push(row_values);
        previous = Some(membership);
    }

    Ok(TurnoverTable {
        dates,
        quantile_count,
        values,
    })
}

/// Compute per-period rank autocorrelation of factor values.
///
/// For each date, the Spearman correlation between that date's factor
/// values and the previous date's, over assets present in both periods.
/// The first period, and periods sharing fewer than two assets with their
/// predecessor, report `NaN`.
#[must_use]
pub fn factor_rank_autocorrelation(data: &MergedFactorData) -> AutocorrelationTable {
    let mut dates = Vec::new();
    let mut values = Vec::new();
    let mut previous: Option<HashMap<&str, f64>> = None;

    for (date, rows) in data.partitions() {
        let current: HashMap<&str, f64> =
            rows.iter().map(|r| (r.symbol.as_str(), r.factor)).collect();

        let value = previous.as_ref().map_or(f64::NAN, |prev| {
            let mut old = Vec::new();
            let mut new = Vec::new();
            // Iterate current rows in input order for determinism.
            for row in rows {
                if let Some(&prev_value) = prev.get(row.symbol.as_str()) {
                    old.push(prev_value);
                    new.push(row.factor);
                }
            }
            spearman(&old, &new)
        });

        dates.push(date);
        values.push(value);
        previous = Some(current);
    }

    AutocorrelationTable { dates, values }
}
