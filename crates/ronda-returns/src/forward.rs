//! Forward-return computation over a price panel.

use std::collections::{HashMap, HashSet};

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use ronda_traits::frame::date_column;
use ronda_traits::{Date, PricePanel, Result, ReturnAdjustment, RondaError, Symbol};

use crate::calendar::Periodicity;

/// A zero or negative price encountered while computing a return.
///
/// The offending return is `NaN` in the table; the violation records the
/// observation date and asset so callers can diagnose or escalate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceViolation {
    /// Observation date of the affected forward return.
    pub date: Date,
    /// Asset whose price was non-positive.
    pub symbol: Symbol,
}

impl PriceViolation {
    /// Escalate the violation into a [`RondaError::InvalidPrice`].
    #[must_use]
    pub fn into_error(self) -> RondaError {
        RondaError::InvalidPrice {
            date: self.date,
            symbol: self.symbol,
        }
    }
}

/// Forward returns per horizon, aligned to the price panel's index.
///
/// Entry (t, a) of horizon h's matrix is the total return of asset a from
/// timestamp t to the h-th subsequent timestamp in the panel index, `NaN`
/// when fewer than h future timestamps exist or a price is missing at
/// either endpoint.
#[derive(Debug, Clone)]
pub struct ForwardReturns {
    dates: Vec<Date>,
    assets: Vec<Symbol>,
    asset_lookup: HashMap<Symbol, usize>,
    horizons: Vec<usize>,
    labels: Vec<String>,
    periodicity: Periodicity,
    values: Vec<Array2<f64>>,
    violations: Vec<PriceViolation>,
}

impl ForwardReturns {
    /// The panel's date index.
    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Asset identifiers, in panel column order.
    #[must_use]
    pub fn assets(&self) -> &[Symbol] {
        &self.assets
    }

    /// Horizons, ascending.
    #[must_use]
    pub fn horizons(&self) -> &[usize] {
        &self.horizons
    }

    /// Horizon column labels, matching [`horizons`](Self::horizons).
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The periodicity inferred from the panel index.
    #[must_use]
    pub const fn periodicity(&self) -> Periodicity {
        self.periodicity
    }

    /// Return for (horizon index, date index, asset index).
    #[must_use]
    pub fn get(&self, horizon_idx: usize, date_idx: usize, asset_idx: usize) -> f64 {
        self.values[horizon_idx][[date_idx, asset_idx]]
    }

    /// Position of a date in the index, if present.
    #[must_use]
    pub fn date_index(&self, date: Date) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Position of an asset, if present.
    #[must_use]
    pub fn asset_index(&self, symbol: &str) -> Option<usize> {
        self.asset_lookup.get(symbol).copied()
    }

    /// Non-positive-price violations encountered, deduplicated by
    /// (date, asset), in scan order.
    #[must_use]
    pub fn violations(&self) -> &[PriceViolation] {
        &self.violations
    }

    /// Render as a long DataFrame: `date`, `symbol`, one column per
    /// horizon label.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Polars`] when column construction fails.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let n_rows = self.dates.len() * self.assets.len();
        let mut dates = Vec::with_capacity(n_rows);
        let mut symbols = Vec::with_capacity(n_rows);
        for date in &self.dates {
            for symbol in &self.assets {
                dates.push(*date);
                symbols.push(symbol.as_str());
            }
        }

        let mut columns = vec![date_column(&dates)?, Column::new("symbol".into(), symbols)];
        for (idx, label) in self.labels.iter().enumerate() {
            let mut values = Vec::with_capacity(n_rows);
            for t in 0..self.dates.len() {
                for a in 0..self.assets.len() {
                    values.push(self.values[idx][[t, a]]);
                }
            }
            columns.push(Column::new(label.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Compute forward returns for every requested horizon.
///
/// Horizons count trading timestamps in the panel's sorted index, never
/// calendar days. Returns are simple returns `p1 / p0 - 1`, optionally
/// rescaled to a per-period or annualized basis with exponent
/// `basis / h`.
///
/// # Errors
///
/// Returns [`RondaError::Schema`] when horizons are empty, zero, or
/// duplicated, or when the panel is shorter than `max(horizons) + 1`
/// timestamps.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use ronda_returns::compute_forward_returns;
/// use ronda_traits::{Date, PricePanel, ReturnAdjustment};
///
/// let dates: Vec<Date> = (2..=5)
///     .map(|d| Date::from_ymd_opt(2024, 1, d).unwrap())
///     .collect();
/// let panel = PricePanel::new(
///     dates,
///     vec!["A".to_string()],
///     array![[100.0], [110.0], [121.0], [133.1]],
/// )
/// .unwrap();
///
/// let forward = compute_forward_returns(&panel, &[1], ReturnAdjustment::None).unwrap();
/// assert!((forward.get(0, 0, 0) - 0.1).abs() < 1e-12);
/// ```
pub fn compute_forward_returns(
    panel: &PricePanel,
    horizons: &[usize],
    adjustment: ReturnAdjustment,
) -> Result<ForwardReturns> {
    if horizons.is_empty() {
        return Err(RondaError::Schema(
            "at least one forward-return horizon is required".to_string(),
        ));
    }
    if horizons.contains(&0) {
        return Err(RondaError::Schema("horizons must be positive".to_string()));
    }
    let mut horizons: Vec<usize> = horizons.to_vec();
    horizons.sort_unstable();
    let before = horizons.len();
    horizons.dedup();
    if horizons.len() != before {
        return Err(RondaError::Schema("horizons must be unique".to_string()));
    }

    let n_dates = panel.n_dates();
    let n_assets = panel.n_assets();
    let max_horizon = *horizons.last().expect("horizons checked non-empty");
    if n_dates < max_horizon + 1 {
        return Err(RondaError::Schema(format!(
            "price panel has {n_dates} timestamps but horizon {max_horizon} \
             requires at least {}",
            max_horizon + 1
        )));
    }

    let periodicity = Periodicity::infer(panel.dates())?;
    let labels: Vec<String> = horizons.iter().map(|h| periodicity.label(*h)).collect();

    let mut values = Vec::with_capacity(horizons.len());
    let mut seen_violations: HashSet<(Date, Symbol)> = HashSet::new();
    let mut violations = Vec::new();

    for &h in &horizons {
        let mut matrix = Array2::from_elem((n_dates, n_assets), f64::NAN);
        let exponent = adjustment_exponent(adjustment, periodicity, h);
        for t in 0..n_dates.saturating_sub(h) {
            for a in 0..n_assets {
                let p0 = panel.price(t, a);
                let p1 = panel.price(t + h, a);
                if p0.is_nan() || p1.is_nan() {
                    continue;
                }
                if p0 <= 0.0 || p1 <= 0.0 {
                    let key = (panel.dates()[t], panel.assets()[a].clone());
                    if seen_violations.insert(key.clone()) {
                        violations.push(PriceViolation {
                            date: key.0,
                            symbol: key.1,
                        });
                    }
                    continue;
                }
                let gross = p1 / p0;
                matrix[[t, a]] = match exponent {
                    Some(e) => gross.powf(e) - 1.0,
                    None => gross - 1.0,
                };
            }
        }
        values.push(matrix);
    }

    Ok(ForwardReturns {
        dates: panel.dates().to_vec(),
        assets: panel.assets().to_vec(),
        asset_lookup: panel
            .assets()
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.clone(), idx))
            .collect(),
        horizons,
        labels,
        periodicity,
        values,
        violations,
    })
}

fn adjustment_exponent(
    adjustment: ReturnAdjustment,
    periodicity: Periodicity,
    horizon: usize,
) -> Option<f64> {
    match adjustment {
        ReturnAdjustment::None => None,
        ReturnAdjustment::PerPeriod => Some(1.0 / horizon as f64),
        ReturnAdjustment::Annualized => {
            Some(periodicity.periods_per_year() as f64 / horizon as f64)
        }
    }
}
