//! The merged factor dataset: the canonical input to every statistic.

use std::ops::Range;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RondaError};
use crate::frame::date_column;
use crate::types::{Date, Symbol};

/// One aligned (date, asset) row of the merged dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    /// Observation date.
    pub date: Date,
    /// Asset identifier.
    pub symbol: Symbol,
    /// Factor value.
    pub factor: f64,
    /// Group label, when a grouping map was supplied.
    pub group: Option<String>,
    /// Weight used for weighted bucket means.
    pub weight: f64,
    /// Forward return per horizon, `NaN` where undefined.
    pub returns: Vec<f64>,
    /// Quantile bucket in `[1, Q]`, assigned by the bucketizer.
    pub quantile: Option<u32>,
}

/// The join of factor values, forward returns, group labels, and weights,
/// keyed by unique (date, asset) pairs.
///
/// Produced once per analysis run by the merger, labeled in place by the
/// bucketizer, and read-only thereafter. Rows are sorted by date; the
/// factor series' input order is preserved within each date.
#[derive(Debug, Clone)]
pub struct MergedFactorData {
    horizons: Vec<usize>,
    labels: Vec<String>,
    rows: Vec<MergedRow>,
    partitions: Vec<(Date, Range<usize>)>,
    quantile_count: Option<u32>,
}

impl MergedFactorData {
    /// Assemble a dataset from rows already grouped by date.
    ///
    /// Rows are stably sorted by date; every row must carry one return per
    /// horizon.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] when a row's return count does not
    /// match the horizon count.
    pub fn new(horizons: Vec<usize>, labels: Vec<String>, mut rows: Vec<MergedRow>) -> Result<Self> {
        for row in &rows {
            if row.returns.len() != horizons.len() {
                return Err(RondaError::Schema(format!(
                    "row for {} on {} carries {} returns, expected {}",
                    row.symbol,
                    row.date,
                    row.returns.len(),
                    horizons.len()
                )));
            }
        }
        rows.sort_by_key(|r| r.date);
        let partitions = build_partitions(&rows);
        Ok(Self {
            horizons,
            labels,
            rows,
            partitions,
            quantile_count: None,
        })
    }

    /// Forward-return horizons, ascending.
    #[must_use]
    pub fn horizons(&self) -> &[usize] {
        &self.horizons
    }

    /// Horizon column labels (`"1D"`, `"5D"`, ...).
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of horizon columns.
    #[must_use]
    pub fn n_horizons(&self) -> usize {
        self.horizons.len()
    }

    /// All rows, sorted by date.
    #[must_use]
    pub fn rows(&self) -> &[MergedRow] {
        &self.rows
    }

    /// Mutable row access for the bucketizer.
    pub fn rows_mut(&mut self) -> &mut [MergedRow] {
        &mut self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The distinct dates present, ascending.
    #[must_use]
    pub fn dates(&self) -> Vec<Date> {
        self.partitions.iter().map(|(date, _)| *date).collect()
    }

    /// Iterate per-date slices, ascending by date.
    pub fn partitions(&self) -> impl Iterator<Item = (Date, &[MergedRow])> {
        self.partitions
            .iter()
            .map(|(date, range)| (*date, &self.rows[range.clone()]))
    }

    /// Per-date row ranges into [`rows`](Self::rows), ascending by date.
    #[must_use]
    pub fn date_ranges(&self) -> &[(Date, Range<usize>)] {
        &self.partitions
    }

    /// The quantile count requested of the bucketizer, once labels exist.
    #[must_use]
    pub const fn quantile_count(&self) -> Option<u32> {
        self.quantile_count
    }

    /// Record the requested quantile count. Called by the bucketizer.
    pub const fn set_quantile_count(&mut self, count: u32) {
        self.quantile_count = Some(count);
    }

    /// Render the dataset as a long DataFrame.
    ///
    /// Columns: `date`, `symbol`, `factor`, `group`, `weight`, one `f64`
    /// column per horizon label, and `quantile` (`u32`, null where
    /// unassigned).
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Polars`] when column construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<Date> = self.rows.iter().map(|r| r.date).collect();
        let symbols: Vec<&str> = self.rows.iter().map(|r| r.symbol.as_str()).collect();
        let factors: Vec<f64> = self.rows.iter().map(|r| r.factor).collect();
        let groups: Vec<Option<&str>> = self.rows.iter().map(|r| r.group.as_deref()).collect();
        let weights: Vec<f64> = self.rows.iter().map(|r| r.weight).collect();
        let quantiles: Vec<Option<u32>> = self.rows.iter().map(|r| r.quantile).collect();

        let mut columns = vec![
            date_column(&dates)?,
            Column::new("symbol".into(), symbols),
            Column::new("factor".into(), factors),
            Column::new("group".into(), groups),
            Column::new("weight".into(), weights),
        ];
        for (idx, label) in self.labels.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|r| r.returns[idx]).collect();
            columns.push(Column::new(label.as_str().into(), values));
        }
        columns.push(Column::new("quantile".into(), quantiles));
        Ok(DataFrame::new(columns)?)
    }
}

fn build_partitions(rows: &[MergedRow]) -> Vec<(Date, Range<usize>)> {
    let mut partitions = Vec::new();
    let mut start = 0;
    for idx in 1..=rows.len() {
        let boundary = idx == rows.len() || rows[idx].date != rows[start].date;
        if boundary {
            partitions.push((rows[start].date, start..idx));
            start = idx;
        }
    }
    partitions
}
