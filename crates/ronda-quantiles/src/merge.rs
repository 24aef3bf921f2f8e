//! Joining factor values with forward returns, groups, and weights.

use std::collections::HashMap;

use ronda_returns::ForwardReturns;
use ronda_traits::{
    AnalysisConfig, DemeanMode, FactorSeries, GroupingMap, MergedFactorData, MergedRow, Result,
    RondaError, WeightScheme, WeightSeries,
};

/// Group label attached to assets absent from a non-strict grouping map.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Join a factor series with its forward returns into the merged dataset.
///
/// The join is inner on (date, asset): factor observations on dates absent
/// from the price panel, or for assets the panel does not carry, simply do
/// not match. Group labels and weights join left: an unmapped asset gets
/// the label [`UNKNOWN_GROUP`] (or fails under strict grouping) and weight
/// 1.0.
///
/// Rows where every horizon return is `NaN` are dropped unless
/// `keep_unmatched_rows`; `drop_partial_horizons` additionally drops rows
/// with any missing horizon. Demeaning, when configured, subtracts the
/// per-date (or per-date-per-group) cross-sectional mean from each horizon
/// column.
///
/// # Errors
///
/// - [`RondaError::Schema`] on configuration inconsistencies (supplied
///   weighting without a weight series, grouped bucketing or demeaning
///   without a grouping map).
/// - [`RondaError::MissingGroup`] under strict grouping for an unmapped
///   asset.
/// - [`RondaError::EmptyFactorData`] when the join produces zero rows —
///   the factor series and price panel are misaligned.
pub fn merge_factor_data(
    factor: &FactorSeries,
    forward: &ForwardReturns,
    groups: Option<&GroupingMap>,
    weights: Option<&WeightSeries>,
    config: &AnalysisConfig,
) -> Result<MergedFactorData> {
    if config.weighting == WeightScheme::Supplied && weights.is_none() {
        return Err(RondaError::Schema(
            "weighting is set to `Supplied` but no weight series was provided".to_string(),
        ));
    }
    if (config.by_group || config.demean == DemeanMode::Group) && groups.is_none() {
        return Err(RondaError::Schema(
            "grouped bucketing or demeaning requires a grouping map".to_string(),
        ));
    }

    let supplied_weights = match config.weighting {
        WeightScheme::Supplied => weights,
        WeightScheme::Equal => None,
    };

    let n_horizons = forward.horizons().len();
    let mut rows = Vec::with_capacity(factor.len());

    for obs in factor.observations() {
        let (Some(t), Some(a)) = (
            forward.date_index(obs.date),
            forward.asset_index(&obs.symbol),
        ) else {
            continue;
        };

        let returns: Vec<f64> = (0..n_horizons).map(|k| forward.get(k, t, a)).collect();
        let all_missing = returns.iter().all(|r| r.is_nan());
        if all_missing && !config.keep_unmatched_rows {
            continue;
        }
        if config.drop_partial_horizons && returns.iter().any(|r| r.is_nan()) {
            continue;
        }

        let group = match groups {
            Some(map) => match map.lookup(obs.date, &obs.symbol) {
                Some(label) => Some(label.to_string()),
                None if config.strict_groups => {
                    return Err(RondaError::MissingGroup {
                        symbol: obs.symbol.clone(),
                    });
                }
                None => Some(UNKNOWN_GROUP.to_string()),
            },
            None => None,
        };

        let weight = supplied_weights
            .map_or(1.0, |w| w.lookup(obs.date, &obs.symbol).unwrap_or(1.0));

        rows.push(MergedRow {
            date: obs.date,
            symbol: obs.symbol.clone(),
            factor: obs.value,
            group,
            weight,
            returns,
            quantile: None,
        });
    }

    if rows.is_empty() {
        return Err(RondaError::EmptyFactorData);
    }

    if config.demean != DemeanMode::None {
        demean_rows(&mut rows, n_horizons, config.demean);
    }

    MergedFactorData::new(forward.horizons().to_vec(), forward.labels().to_vec(), rows)
}

/// Subtract the cross-sectional mean from each horizon column, per date
/// (and per group for [`DemeanMode::Group`]). `NaN` entries neither
/// contribute to nor receive the adjustment.
fn demean_rows(rows: &mut [MergedRow], n_horizons: usize, mode: DemeanMode) {
    let mut start = 0;
    while start < rows.len() {
        let mut end = start;
        while end < rows.len() && rows[end].date == rows[start].date {
            end += 1;
        }

        match mode {
            DemeanMode::Universe => demean_slice(&mut rows[start..end], n_horizons, None),
            DemeanMode::Group => {
                let labels: Vec<String> = {
                    let mut seen = Vec::new();
                    for row in &rows[start..end] {
                        if let Some(g) = &row.group {
                            if !seen.contains(g) {
                                seen.push(g.clone());
                            }
                        }
                    }
                    seen
                };
                for label in labels {
                    demean_slice(&mut rows[start..end], n_horizons, Some(&label));
                }
            }
            DemeanMode::None => {}
        }

        start = end;
    }
}

fn demean_slice(rows: &mut [MergedRow], n_horizons: usize, group: Option<&str>) {
    for k in 0..n_horizons {
        let mut sum = 0.0;
        let mut count = 0usize;
        for row in rows.iter() {
            if group.is_some_and(|g| row.group.as_deref() != Some(g)) {
                continue;
            }
            let r = row.returns[k];
            if r.is_finite() {
                sum += r;
                count += 1;
            }
        }
        if count == 0 {
            continue;
        }
        let mean = sum / count as f64;
        for row in rows.iter_mut() {
            if group.is_some_and(|g| row.group.as_deref() != Some(g)) {
                continue;
            }
            if row.returns[k].is_finite() {
                row.returns[k] -= mean;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use ronda_returns::compute_forward_returns;
    use ronda_traits::{Date, FactorObservation, PricePanel, ReturnAdjustment};
    use std::collections::HashMap;

    fn date(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_forward() -> ForwardReturns {
        let dates: Vec<Date> = (2..=5).map(date).collect();
        let panel = PricePanel::new(
            dates,
            vec!["A".to_string(), "B".to_string()],
            array![
                [100.0, 50.0],
                [110.0, 51.0],
                [121.0, 52.02],
                [133.1, 53.06]
            ],
        )
        .unwrap();
        compute_forward_returns(&panel, &[1, 2], ReturnAdjustment::None).unwrap()
    }

    fn factor_on(days: &[u32]) -> FactorSeries {
        let mut obs = Vec::new();
        for &day in days {
            obs.push(FactorObservation::new(date(day), "A", 1.0));
            obs.push(FactorObservation::new(date(day), "B", 2.0));
        }
        FactorSeries::new(obs).unwrap()
    }

    #[test]
    fn test_inner_join_aligns_dates_and_assets() {
        let forward = sample_forward();
        let factor = FactorSeries::new(vec![
            FactorObservation::new(date(2), "A", 1.0),
            FactorObservation::new(date(2), "Z", 2.0), // not in panel
            FactorObservation::new(date(20), "A", 3.0), // date not in panel
        ])
        .unwrap();

        let merged = merge_factor_data(
            &factor,
            &forward,
            None,
            None,
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(merged.len(), 1);
        let row = &merged.rows()[0];
        assert_eq!(row.symbol, "A");
        assert_relative_eq!(row.returns[0], 0.1, max_relative = 1e-12);
        assert!(row.group.is_none());
        assert_eq!(row.weight, 1.0);
    }

    #[test]
    fn test_disjoint_calendars_fail() {
        let forward = sample_forward();
        let factor = FactorSeries::new(vec![FactorObservation::new(
            Date::from_ymd_opt(2030, 1, 2).unwrap(),
            "A",
            1.0,
        )])
        .unwrap();

        let result = merge_factor_data(
            &factor,
            &forward,
            None,
            None,
            &AnalysisConfig::default(),
        );
        assert!(matches!(result, Err(RondaError::EmptyFactorData)));
    }

    #[test]
    fn test_all_nan_rows_dropped_partial_kept() {
        let forward = sample_forward();
        // Date 5 is the last panel date: both horizons NaN -> dropped.
        // Date 4 has h=1 but not h=2 -> kept with NaN.
        let factor = factor_on(&[4, 5]);

        let merged = merge_factor_data(
            &factor,
            &forward,
            None,
            None,
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(merged.len(), 2);
        for row in merged.rows() {
            assert_eq!(row.date, date(4));
            assert!(row.returns[0].is_finite());
            assert!(row.returns[1].is_nan());
        }
    }

    #[test]
    fn test_drop_partial_horizons() {
        let forward = sample_forward();
        let factor = factor_on(&[2, 4]);

        let config = AnalysisConfig {
            drop_partial_horizons: true,
            ..Default::default()
        };
        let merged = merge_factor_data(&factor, &forward, None, None, &config).unwrap();

        assert!(merged.rows().iter().all(|r| r.date == date(2)));
    }

    #[test]
    fn test_keep_unmatched_rows() {
        let forward = sample_forward();
        let factor = factor_on(&[5]);

        let config = AnalysisConfig {
            keep_unmatched_rows: true,
            ..Default::default()
        };
        let merged = merge_factor_data(&factor, &forward, None, None, &config).unwrap();

        assert_eq!(merged.len(), 2);
        assert!(merged.rows().iter().all(|r| r.returns.iter().all(|x| x.is_nan())));
    }

    #[test]
    fn test_group_join_and_unknown() {
        let forward = sample_forward();
        let factor = factor_on(&[2]);
        let groups = GroupingMap::by_asset(HashMap::from([(
            "A".to_string(),
            "Tech".to_string(),
        )]));

        let merged = merge_factor_data(
            &factor,
            &forward,
            Some(&groups),
            None,
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(merged.rows()[0].group.as_deref(), Some("Tech"));
        assert_eq!(merged.rows()[1].group.as_deref(), Some(UNKNOWN_GROUP));
    }

    #[test]
    fn test_strict_groups_fail() {
        let forward = sample_forward();
        let factor = factor_on(&[2]);
        let groups = GroupingMap::by_asset(HashMap::from([(
            "A".to_string(),
            "Tech".to_string(),
        )]));

        let config = AnalysisConfig {
            strict_groups: true,
            ..Default::default()
        };
        let result = merge_factor_data(&factor, &forward, Some(&groups), None, &config);
        assert!(
            matches!(result, Err(RondaError::MissingGroup { symbol }) if symbol == "B")
        );
    }

    #[test]
    fn test_supplied_weights() {
        let forward = sample_forward();
        let factor = factor_on(&[2]);
        let weights =
            WeightSeries::by_asset(HashMap::from([("A".to_string(), 3.0)])).unwrap();

        let config = AnalysisConfig {
            weighting: WeightScheme::Supplied,
            ..Default::default()
        };
        let merged =
            merge_factor_data(&factor, &forward, None, Some(&weights), &config).unwrap();

        assert_eq!(merged.rows()[0].weight, 3.0);
        assert_eq!(merged.rows()[1].weight, 1.0); // unmapped falls back

        let missing = merge_factor_data(&factor, &forward, None, None, &config);
        assert!(matches!(missing, Err(RondaError::Schema(_))));
    }

    #[test]
    fn test_universe_demean() {
        let forward = sample_forward();
        let factor = factor_on(&[2]);

        let config = AnalysisConfig {
            demean: DemeanMode::Universe,
            ..Default::default()
        };
        let merged = merge_factor_data(&factor, &forward, None, None, &config).unwrap();

        // Per-date cross-sectional mean is zero after demeaning.
        let sum: f64 = merged.rows().iter().map(|r| r.returns[0]).sum();
        assert_relative_eq!(sum, 0.0, epsilon = 1e-12);
    }
}
