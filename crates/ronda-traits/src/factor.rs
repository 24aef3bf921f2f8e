//! The factor series: long-form (date, asset, value) observations.

use std::collections::HashSet;
use std::ops::Range;

use polars::prelude::*;

use crate::error::{Result, RondaError};
use crate::frame::read_date_column;
use crate::types::{Date, Symbol};

/// A single cross-sectional factor observation.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorObservation {
    /// Observation date.
    pub date: Date,
    /// Asset identifier.
    pub symbol: Symbol,
    /// Factor value.
    pub value: f64,
}

impl FactorObservation {
    /// Create a new observation.
    #[must_use]
    pub fn new(date: Date, symbol: impl Into<Symbol>, value: f64) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            value,
        }
    }
}

/// A time-indexed, asset-indexed series of factor values.
///
/// Observations are stably sorted by date at construction; the original
/// input order is preserved within each date and later serves as the
/// deterministic tie-break when quantile buckets are assigned. Non-finite
/// values are dropped (the count is kept for inspection); duplicate
/// (date, symbol) keys are rejected.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use ronda_traits::{FactorObservation, FactorSeries};
///
/// let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
/// let series = FactorSeries::new(vec![
///     FactorObservation::new(d, "AAPL", 0.8),
///     FactorObservation::new(d, "MSFT", -0.2),
/// ])
/// .unwrap();
/// assert_eq!(series.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct FactorSeries {
    observations: Vec<FactorObservation>,
    partitions: Vec<(Date, Range<usize>)>,
    dropped_non_finite: usize,
}

impl FactorSeries {
    /// Build a series from raw observations.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] on duplicate (date, symbol) keys.
    pub fn new(observations: Vec<FactorObservation>) -> Result<Self> {
        let before = observations.len();
        let mut observations: Vec<FactorObservation> = observations
            .into_iter()
            .filter(|o| o.value.is_finite())
            .collect();
        let dropped_non_finite = before - observations.len();

        // Stable: input order within each date is preserved.
        observations.sort_by_key(|o| o.date);

        let mut seen: HashSet<(Date, Symbol)> = HashSet::with_capacity(observations.len());
        for obs in &observations {
            if !seen.insert((obs.date, obs.symbol.clone())) {
                return Err(RondaError::Schema(format!(
                    "duplicate factor observation for {} on {}",
                    obs.symbol, obs.date
                )));
            }
        }

        let partitions = build_partitions(&observations);
        Ok(Self {
            observations,
            partitions,
            dropped_non_finite,
        })
    }

    /// Build a series from a long DataFrame with `date`, `symbol`, and
    /// `factor` columns.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] when a required column is missing or
    /// of the wrong type.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let dates = read_date_column(df.column("date").map_err(|_| {
            RondaError::Schema("factor series requires a `date` column".to_string())
        })?)?;
        let symbols = df
            .column("symbol")
            .map_err(|_| RondaError::Schema("factor series requires a `symbol` column".to_string()))?
            .as_materialized_series()
            .str()
            .map_err(|_| RondaError::Schema("`symbol` column must be of string type".to_string()))?
            .into_iter()
            .map(|s: Option<&str>| {
                s.map(ToString::to_string).ok_or_else(|| {
                    RondaError::Schema("`symbol` column contains nulls".to_string())
                })
            })
            .collect::<Result<Vec<Symbol>>>()?;
        let values: Vec<f64> = df
            .column("factor")
            .map_err(|_| RondaError::Schema("factor series requires a `factor` column".to_string()))?
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|_| RondaError::Schema("`factor` column is not numeric".to_string()))?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();

        let observations = dates
            .into_iter()
            .zip(symbols)
            .zip(values)
            .map(|((date, symbol), value)| FactorObservation {
                date,
                symbol,
                value,
            })
            .collect();
        Self::new(observations)
    }

    /// All observations, sorted by date, input order preserved within dates.
    #[must_use]
    pub fn observations(&self) -> &[FactorObservation] {
        &self.observations
    }

    /// Number of observations retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the series is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of non-finite observations dropped at construction.
    #[must_use]
    pub const fn dropped_non_finite(&self) -> usize {
        self.dropped_non_finite
    }

    /// Iterate per-date slices, ascending by date.
    pub fn partitions(&self) -> impl Iterator<Item = (Date, &[FactorObservation])> {
        self.partitions
            .iter()
            .map(|(date, range)| (*date, &self.observations[range.clone()]))
    }
}

fn build_partitions(observations: &[FactorObservation]) -> Vec<(Date, Range<usize>)> {
    let mut partitions = Vec::new();
    let mut start = 0;
    for idx in 1..=observations.len() {
        let boundary =
            idx == observations.len() || observations[idx].date != observations[start].date;
        if boundary {
            partitions.push((observations[start].date, start..idx));
            start = idx;
        }
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_sorted_by_date_stable_within_date() {
        let series = FactorSeries::new(vec![
            FactorObservation::new(date(3), "B", 2.0),
            FactorObservation::new(date(2), "C", 1.0),
            FactorObservation::new(date(3), "A", 2.0),
        ])
        .unwrap();

        let symbols: Vec<&str> = series
            .observations()
            .iter()
            .map(|o| o.symbol.as_str())
            .collect();
        // Date 2 first; within date 3 the input order B-before-A survives.
        assert_eq!(symbols, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_drops_non_finite() {
        let series = FactorSeries::new(vec![
            FactorObservation::new(date(2), "A", 1.0),
            FactorObservation::new(date(2), "B", f64::NAN),
            FactorObservation::new(date(2), "C", f64::INFINITY),
        ])
        .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.dropped_non_finite(), 2);
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let result = FactorSeries::new(vec![
            FactorObservation::new(date(2), "A", 1.0),
            FactorObservation::new(date(2), "A", 2.0),
        ]);
        assert!(matches!(result, Err(RondaError::Schema(_))));
    }

    #[test]
    fn test_partitions() {
        let series = FactorSeries::new(vec![
            FactorObservation::new(date(2), "A", 1.0),
            FactorObservation::new(date(2), "B", 2.0),
            FactorObservation::new(date(4), "A", 3.0),
        ])
        .unwrap();

        let partitions: Vec<(Date, usize)> = series
            .partitions()
            .map(|(date, rows)| (date, rows.len()))
            .collect();
        assert_eq!(partitions, vec![(date(2), 2), (date(4), 1)]);
    }

    #[test]
    fn test_from_dataframe() {
        use crate::frame::date_column;

        let dates = vec![date(2), date(2)];
        let df = DataFrame::new(vec![
            date_column(&dates).unwrap(),
            Column::new("symbol".into(), vec!["A", "B"]),
            Column::new("factor".into(), vec![0.5, -0.5]),
        ])
        .unwrap();

        let series = FactorSeries::from_dataframe(&df).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.observations()[1].value, -0.5);
    }
}
