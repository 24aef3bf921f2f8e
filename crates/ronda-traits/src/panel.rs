//! The price panel: a dense (date × asset) matrix of prices.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2};
use polars::prelude::*;

use crate::error::{Result, RondaError};
use crate::frame::{date_column, read_date_column};
use crate::types::{Date, Symbol};

/// A table of prices indexed by date, one column per asset.
///
/// Timestamps are strictly increasing and unique; asset identifiers are
/// unique. Gaps (untraded assets) are `NaN`. Both invariants are validated
/// at construction and violations surface as [`RondaError::Schema`] before
/// any computation proceeds.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use ndarray::array;
/// use ronda_traits::PricePanel;
///
/// let dates = vec![
///     NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
/// ];
/// let assets = vec!["AAPL".to_string(), "MSFT".to_string()];
/// let prices = array![[150.0, 300.0], [151.5, 298.0]];
///
/// let panel = PricePanel::new(dates, assets, prices).unwrap();
/// assert_eq!(panel.n_dates(), 2);
/// assert_eq!(panel.n_assets(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PricePanel {
    dates: Vec<Date>,
    assets: Vec<Symbol>,
    prices: Array2<f64>,
    asset_lookup: HashMap<Symbol, usize>,
}

impl PricePanel {
    /// Create a panel from a date index, asset identifiers, and a
    /// (dates × assets) price matrix.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] when timestamps are not strictly
    /// increasing, assets are duplicated, or the matrix shape does not
    /// match the indices.
    pub fn new(dates: Vec<Date>, assets: Vec<Symbol>, prices: Array2<f64>) -> Result<Self> {
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RondaError::Schema(
                "price panel timestamps must be strictly increasing and unique".to_string(),
            ));
        }
        if prices.nrows() != dates.len() || prices.ncols() != assets.len() {
            return Err(RondaError::Schema(format!(
                "price matrix shape ({}, {}) does not match {} dates x {} assets",
                prices.nrows(),
                prices.ncols(),
                dates.len(),
                assets.len()
            )));
        }
        let mut asset_lookup = HashMap::with_capacity(assets.len());
        for (idx, asset) in assets.iter().enumerate() {
            if asset_lookup.insert(asset.clone(), idx).is_some() {
                return Err(RondaError::Schema(format!(
                    "duplicate asset column: {asset}"
                )));
            }
        }
        Ok(Self {
            dates,
            assets,
            prices,
            asset_lookup,
        })
    }

    /// Build a panel from a wide DataFrame: a `date` column plus one
    /// numeric column per asset.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] when the `date` column is missing or
    /// not of date type, an asset column cannot be read as numeric, or the
    /// panel invariants do not hold.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let date_col = df
            .column("date")
            .map_err(|_| RondaError::Schema("price panel requires a `date` column".to_string()))?;
        let dates = read_date_column(date_col)?;

        let mut assets = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        for col in df.get_columns() {
            let name = col.name().as_str();
            if name == "date" {
                continue;
            }
            let series = col
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|_| {
                    RondaError::Schema(format!("price column `{name}` is not numeric"))
                })?;
            let values: Vec<f64> = series
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            assets.push(name.to_string());
            columns.push(values);
        }

        let n_dates = dates.len();
        let n_assets = assets.len();
        let prices = Array2::from_shape_fn((n_dates, n_assets), |(t, a)| columns[a][t]);
        Self::new(dates, assets, prices)
    }

    /// The date index, ascending.
    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Asset identifiers, in column order.
    #[must_use]
    pub fn assets(&self) -> &[Symbol] {
        &self.assets
    }

    /// Number of timestamps.
    #[must_use]
    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    /// Number of assets.
    #[must_use]
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// A view of the (dates × assets) price matrix.
    #[must_use]
    pub fn prices(&self) -> ArrayView2<'_, f64> {
        self.prices.view()
    }

    /// Price at (date index, asset index). `NaN` marks a gap.
    #[must_use]
    pub fn price(&self, date_idx: usize, asset_idx: usize) -> f64 {
        self.prices[[date_idx, asset_idx]]
    }

    /// Position of a date in the index, if present.
    #[must_use]
    pub fn date_index(&self, date: Date) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Position of an asset column, if present.
    #[must_use]
    pub fn asset_index(&self, symbol: &str) -> Option<usize> {
        self.asset_lookup.get(symbol).copied()
    }

    /// Render the panel back into its wide DataFrame form.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Polars`] when column construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.assets.len() + 1);
        columns.push(date_column(&self.dates)?);
        for (idx, asset) in self.assets.iter().enumerate() {
            let values: Vec<f64> = self.prices.column(idx).to_vec();
            columns.push(Column::new(asset.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}
