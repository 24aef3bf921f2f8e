//! Group labels and asset weights attached to factor observations.

use std::collections::HashMap;

use crate::error::{Result, RondaError};
use crate::types::{Date, Symbol};

/// Maps assets to group labels (sector, industry, country, ...).
///
/// A mapping is either static (one label per asset) or time-varying
/// (a label per (date, asset) pair, for universes where membership
/// changes over time).
#[derive(Debug, Clone)]
pub struct GroupingMap {
    inner: GroupInner,
}

#[derive(Debug, Clone)]
enum GroupInner {
    Static(HashMap<Symbol, String>),
    ByDate(HashMap<(Date, Symbol), String>),
}

impl GroupingMap {
    /// A static mapping from asset to group label.
    #[must_use]
    pub const fn by_asset(map: HashMap<Symbol, String>) -> Self {
        Self {
            inner: GroupInner::Static(map),
        }
    }

    /// A time-varying mapping from (date, asset) to group label.
    #[must_use]
    pub const fn by_date(map: HashMap<(Date, Symbol), String>) -> Self {
        Self {
            inner: GroupInner::ByDate(map),
        }
    }

    /// Group label for an asset on a date, if mapped.
    #[must_use]
    pub fn lookup(&self, date: Date, symbol: &str) -> Option<&str> {
        match &self.inner {
            GroupInner::Static(map) => map.get(symbol).map(String::as_str),
            GroupInner::ByDate(map) => map
                .get(&(date, symbol.to_string()))
                .map(String::as_str),
        }
    }
}

/// Non-negative weights used for weighted bucket means.
///
/// Like [`GroupingMap`], weights are static or time-varying. Weights must
/// be finite and non-negative; violations are rejected at construction.
#[derive(Debug, Clone)]
pub struct WeightSeries {
    inner: WeightInner,
}

#[derive(Debug, Clone)]
enum WeightInner {
    Static(HashMap<Symbol, f64>),
    ByDate(HashMap<(Date, Symbol), f64>),
}

impl WeightSeries {
    /// A static weight per asset.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] on negative or non-finite weights.
    pub fn by_asset(map: HashMap<Symbol, f64>) -> Result<Self> {
        validate_weights(map.iter().map(|(symbol, w)| (symbol.as_str(), *w)))?;
        Ok(Self {
            inner: WeightInner::Static(map),
        })
    }

    /// A weight per (date, asset) pair.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] on negative or non-finite weights.
    pub fn by_date(map: HashMap<(Date, Symbol), f64>) -> Result<Self> {
        validate_weights(map.iter().map(|((_, symbol), w)| (symbol.as_str(), *w)))?;
        Ok(Self {
            inner: WeightInner::ByDate(map),
        })
    }

    /// Weight for an asset on a date, if mapped.
    #[must_use]
    pub fn lookup(&self, date: Date, symbol: &str) -> Option<f64> {
        match &self.inner {
            WeightInner::Static(map) => map.get(symbol).copied(),
            WeightInner::ByDate(map) => map.get(&(date, symbol.to_string())).copied(),
        }
    }
}

fn validate_weights<'a>(weights: impl Iterator<Item = (&'a str, f64)>) -> Result<()> {
    for (symbol, weight) in weights {
        if !weight.is_finite() || weight < 0.0 {
            return Err(RondaError::Schema(format!(
                "weight for {symbol} must be finite and non-negative, got {weight}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_static_group_lookup() {
        let map = GroupingMap::by_asset(HashMap::from([(
            "AAPL".to_string(),
            "Technology".to_string(),
        )]));
        assert_eq!(map.lookup(date(2), "AAPL"), Some("Technology"));
        assert_eq!(map.lookup(date(2), "XOM"), None);
    }

    #[test]
    fn test_dated_group_lookup() {
        let map = GroupingMap::by_date(HashMap::from([(
            (date(2), "GE".to_string()),
            "Industrials".to_string(),
        )]));
        assert_eq!(map.lookup(date(2), "GE"), Some("Industrials"));
        assert_eq!(map.lookup(date(3), "GE"), None);
    }

    #[test]
    fn test_weights_validated() {
        let err = WeightSeries::by_asset(HashMap::from([("A".to_string(), -1.0)]));
        assert!(matches!(err, Err(RondaError::Schema(_))));

        let err = WeightSeries::by_asset(HashMap::from([("A".to_string(), f64::NAN)]));
        assert!(matches!(err, Err(RondaError::Schema(_))));

        let ok = WeightSeries::by_asset(HashMap::from([("A".to_string(), 2.5)])).unwrap();
        assert_eq!(ok.lookup(date(2), "A"), Some(2.5));
        assert_eq!(ok.lookup(date(2), "B"), None);
    }
}
