//! DataFrame boundary helpers shared by the typed data model.

use polars::prelude::*;

use crate::error::{Result, RondaError};
use crate::types::{self, Date};

/// Build a polars `Date` column named `date` from chrono dates.
///
/// # Errors
///
/// Returns [`RondaError::Polars`] when the cast to the date type fails.
pub fn date_column(dates: &[Date]) -> Result<Column> {
    let days: Vec<i32> = dates.iter().map(|d| types::to_epoch_days(*d)).collect();
    let series = Series::new("date".into(), days).cast(&DataType::Date)?;
    Ok(series.into())
}

/// Read a polars `Date` column into chrono dates.
///
/// # Errors
///
/// Returns [`RondaError::Schema`] when the column is not of date type or
/// contains nulls.
pub fn read_date_column(col: &Column) -> Result<Vec<Date>> {
    let chunked = col
        .as_materialized_series()
        .date()
        .map_err(|_| RondaError::Schema("`date` column must be of date type".to_string()))?;
    chunked
        .into_iter()
        .map(|d: Option<i32>| {
            d.and_then(types::from_epoch_days)
                .ok_or_else(|| RondaError::Schema("`date` column contains nulls".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_column_round_trip() {
        let dates = vec![
            Date::from_ymd_opt(2024, 1, 2).unwrap(),
            Date::from_ymd_opt(2024, 1, 3).unwrap(),
        ];
        let col = date_column(&dates).unwrap();
        assert_eq!(read_date_column(&col).unwrap(), dates);
    }

    #[test]
    fn test_read_rejects_non_date() {
        let col = Column::new("date".into(), vec![1.0, 2.0]);
        assert!(matches!(
            read_date_column(&col),
            Err(RondaError::Schema(_))
        ));
    }
}
