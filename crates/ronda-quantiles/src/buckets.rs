//! Per-partition quantile bucket assignment.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use ronda_traits::{
    AnalysisConfig, Date, MergedFactorData, QuantileSpec, Result, RondaError,
};

/// A partition that could not populate every requested bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegeneratePartition {
    /// Date of the partition.
    pub date: Date,
    /// Group label, for per-group partitions.
    pub group: Option<String>,
    /// Distinct factor values observed in the partition.
    pub distinct: usize,
}

/// Outcome of a bucketing pass.
///
/// Degenerate partitions are flagged rather than raised; statistics over
/// their unpopulated buckets report `NaN`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuantileReport {
    /// Partitions that populated fewer buckets than requested.
    pub degenerate_partitions: Vec<DegeneratePartition>,
}

impl QuantileReport {
    /// Whether every partition populated the full bucket count.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.degenerate_partitions.is_empty()
    }
}

/// Assign a quantile bucket to every row of the merged dataset.
///
/// Partitions are per date, or per (date, group) under `by_group`. Three
/// modes, selected by the configuration:
///
/// - **Equal-count** ([`QuantileSpec::Count`], default): rows are stably
///   sorted by factor value within the partition and rank-binned into Q
///   buckets of near-equal population. Ties that straddle a bucket
///   boundary are split by original input order, which makes the
///   assignment deterministic and labels non-decreasing in factor value.
/// - **Fixed edges** ([`QuantileSpec::Edges`]): values are assigned to
///   right-closed intervals between the caller's edges; the lowest edge is
///   inclusive. Rows outside the edge range stay unlabeled.
/// - **Pooled edges** (`pooled_edges` with `by_group`): empirical quantile
///   edges are computed per date across all groups, then applied within
///   each (date, group) partition.
///
/// Partitions with fewer distinct values than buckets collapse to compact
/// labels `1..=d` and are flagged in the report, or fail with
/// [`RondaError::InsufficientBreadth`] under strict breadth. No row is
/// dropped by this step.
///
/// # Errors
///
/// [`RondaError::Schema`] on invalid configuration or rows missing group
/// labels under `by_group`; [`RondaError::InsufficientBreadth`] under
/// strict breadth.
pub fn assign_quantiles(
    data: &mut MergedFactorData,
    config: &AnalysisConfig,
) -> Result<QuantileReport> {
    config.validate()?;
    let bucket_count = config.quantiles.bucket_count();
    data.set_quantile_count(bucket_count);

    // Idempotent re-runs: clear any previous labels first.
    for row in data.rows_mut() {
        row.quantile = None;
    }

    let ranges: Vec<(Date, std::ops::Range<usize>)> = data.date_ranges().to_vec();
    let mut assignments: Vec<(usize, u32)> = Vec::with_capacity(data.len());
    let mut report = QuantileReport::default();

    for (date, range) in ranges {
        let rows = &data.rows()[range.clone()];

        if config.by_group {
            for row in rows {
                if row.group.is_none() {
                    return Err(RondaError::Schema(format!(
                        "grouped bucketing requires a group label on every row; \
                         {} on {} has none",
                        row.symbol, row.date
                    )));
                }
            }
        }

        match (&config.quantiles, config.by_group) {
            (QuantileSpec::Edges(edges), by_group) => {
                let partitions = partition_indices(rows, range.start, by_group);
                for (_, indices) in partitions {
                    assign_by_edges(data, &indices, edges, false, &mut assignments);
                }
            }
            (QuantileSpec::Count(q), true) if config.pooled_edges => {
                let pooled: Vec<f64> = rows.iter().map(|r| r.factor).collect();
                let distinct = distinct_count(&pooled);
                let edges = empirical_edges(&pooled, *q);
                if edges.len() < *q as usize + 1 {
                    if config.strict_breadth {
                        return Err(RondaError::InsufficientBreadth {
                            date,
                            distinct,
                            required: *q as usize,
                        });
                    }
                    report.degenerate_partitions.push(DegeneratePartition {
                        date,
                        group: None,
                        distinct,
                    });
                }
                let partitions = partition_indices(rows, range.start, true);
                for (_, indices) in partitions {
                    assign_by_edges(data, &indices, &edges, true, &mut assignments);
                }
            }
            (QuantileSpec::Count(q), by_group) => {
                let partitions = partition_indices(rows, range.start, by_group);
                for (group, indices) in partitions {
                    assign_by_rank(
                        data,
                        date,
                        group,
                        &indices,
                        *q,
                        config.strict_breadth,
                        &mut assignments,
                        &mut report,
                    )?;
                }
            }
        }
    }

    for (idx, label) in assignments {
        data.rows_mut()[idx].quantile = Some(label);
    }
    Ok(report)
}

/// Split a date slice into (group, global row indices) partitions.
///
/// With `by_group` unset, a single unnamed partition covers the slice.
/// Group order follows first appearance, row order within a group follows
/// input order.
fn partition_indices(
    rows: &[ronda_traits::MergedRow],
    offset: usize,
    by_group: bool,
) -> Vec<(Option<String>, Vec<usize>)> {
    if !by_group {
        return vec![(None, (offset..offset + rows.len()).collect())];
    }
    let mut partitions: Vec<(Option<String>, Vec<usize>)> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let label = row.group.clone();
        match partitions.iter_mut().find(|(g, _)| *g == label) {
            Some((_, indices)) => indices.push(offset + i),
            None => partitions.push((label, vec![offset + i])),
        }
    }
    partitions
}

/// Equal-count rank binning over one partition.
#[allow(clippy::too_many_arguments)]
fn assign_by_rank(
    data: &MergedFactorData,
    date: Date,
    group: Option<String>,
    indices: &[usize],
    q: u32,
    strict: bool,
    assignments: &mut Vec<(usize, u32)>,
    report: &mut QuantileReport,
) -> Result<()> {
    let values: Vec<f64> = indices.iter().map(|&i| data.rows()[i].factor).collect();
    let distinct = distinct_count(&values);

    // Stable sort: equal factor values keep their input order, which is
    // the documented tie-break at bucket boundaries.
    let mut order: Vec<usize> = (0..indices.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    if distinct < q as usize {
        if strict {
            return Err(RondaError::InsufficientBreadth {
                date,
                distinct,
                required: q as usize,
            });
        }
        report.degenerate_partitions.push(DegeneratePartition {
            date,
            group,
            distinct,
        });
        // Collapse: one bucket per distinct value, labels 1..=d.
        let mut label = 0u32;
        let mut prev = f64::NAN;
        for &pos in &order {
            if values[pos] != prev {
                label += 1;
                prev = values[pos];
            }
            assignments.push((indices[pos], label));
        }
        return Ok(());
    }

    let n = indices.len() as u64;
    for (rank, &pos) in order.iter().enumerate() {
        let label = (rank as u64 * u64::from(q) / n) as u32 + 1;
        assignments.push((indices[pos], label));
    }
    Ok(())
}

/// Interval assignment against ascending edges.
///
/// Intervals are right-closed with the lowest edge inclusive. When
/// `clamp` is set (pooled-edge mode), out-of-range values snap to the
/// first or last bucket; otherwise they stay unlabeled.
fn assign_by_edges(
    data: &MergedFactorData,
    indices: &[usize],
    edges: &[f64],
    clamp: bool,
    assignments: &mut Vec<(usize, u32)>,
) {
    let n_buckets = edges.len().saturating_sub(1);
    if n_buckets == 0 {
        return;
    }
    for &idx in indices {
        let value = data.rows()[idx].factor;
        let label = if value < edges[0] {
            if clamp { Some(1) } else { None }
        } else if value > edges[n_buckets] {
            if clamp { Some(n_buckets as u32) } else { None }
        } else if value == edges[0] {
            Some(1)
        } else {
            let bucket = edges[1..=n_buckets].partition_point(|e| value > *e) + 1;
            Some(bucket.min(n_buckets) as u32)
        };
        if let Some(label) = label {
            assignments.push((idx, label));
        }
    }
}

/// Number of distinct finite values.
fn distinct_count(values: &[f64]) -> usize {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mut count = 0;
    let mut prev = f64::NAN;
    for v in sorted {
        if v != prev {
            count += 1;
            prev = v;
        }
    }
    count
}

/// Empirical quantile edges at k/q, k = 0..=q, with linear interpolation,
/// deduplicated. Collapsed edges yield fewer buckets.
fn empirical_edges(values: &[f64], q: u32) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    if sorted.is_empty() {
        return Vec::new();
    }

    let n = sorted.len();
    let mut edges = Vec::with_capacity(q as usize + 1);
    for k in 0..=q {
        let pos = f64::from(k) / f64::from(q) * (n - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let edge = if lo == hi {
            sorted[lo]
        } else {
            sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
        };
        edges.push(edge);
    }
    edges.dedup();
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use ronda_traits::{MergedRow, QuantileSpec};

    fn date(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn row(day: u32, symbol: &str, factor: f64, group: Option<&str>) -> MergedRow {
        MergedRow {
            date: date(day),
            symbol: symbol.to_string(),
            factor,
            group: group.map(ToString::to_string),
            weight: 1.0,
            returns: vec![0.0],
            quantile: None,
        }
    }

    fn dataset(rows: Vec<MergedRow>) -> MergedFactorData {
        MergedFactorData::new(vec![1], vec!["1D".to_string()], rows).unwrap()
    }

    fn config(quantiles: QuantileSpec) -> AnalysisConfig {
        AnalysisConfig {
            quantiles,
            horizons: vec![1],
            ..Default::default()
        }
    }

    fn labels_for(data: &MergedFactorData, day: u32) -> Vec<(String, Option<u32>)> {
        data.rows()
            .iter()
            .filter(|r| r.date == date(day))
            .map(|r| (r.symbol.clone(), r.quantile))
            .collect()
    }

    #[test]
    fn test_equal_count_labels_monotone() {
        let mut data = dataset(vec![
            row(2, "A", 3.0, None),
            row(2, "B", 1.0, None),
            row(2, "C", 2.0, None),
            row(2, "D", 4.0, None),
        ]);
        let report = assign_quantiles(&mut data, &config(QuantileSpec::Count(2))).unwrap();

        assert!(report.is_clean());
        assert_eq!(
            labels_for(&data, 2),
            vec![
                ("A".to_string(), Some(2)),
                ("B".to_string(), Some(1)),
                ("C".to_string(), Some(1)),
                ("D".to_string(), Some(2)),
            ]
        );
        assert_eq!(data.quantile_count(), Some(2));
    }

    #[test]
    fn test_every_row_labeled_exactly_once() {
        let mut data = dataset(
            (0..10)
                .map(|i| row(2, &format!("S{i}"), (i % 7) as f64 + 0.1 * i as f64, None))
                .collect(),
        );
        assign_quantiles(&mut data, &config(QuantileSpec::Count(3))).unwrap();

        assert!(data.rows().iter().all(|r| r.quantile.is_some()));
        let total: usize = (1..=3)
            .map(|q| data.rows().iter().filter(|r| r.quantile == Some(q)).count())
            .sum();
        assert_eq!(total, data.len());
    }

    #[test]
    fn test_ties_straddling_boundary_split_by_input_order() {
        // Four equal values into two buckets: input order decides.
        let mut data = dataset(vec![
            row(2, "A", 1.0, None),
            row(2, "B", 1.0, None),
            row(2, "C", 1.0, None),
            row(2, "D", 1.0, None),
            row(2, "E", 2.0, None),
        ]);
        // Two distinct values, two buckets: not degenerate.
        assign_quantiles(&mut data, &config(QuantileSpec::Count(2))).unwrap();

        assert_eq!(
            labels_for(&data, 2),
            vec![
                ("A".to_string(), Some(1)),
                ("B".to_string(), Some(1)),
                ("C".to_string(), Some(1)),
                ("D".to_string(), Some(2)),
                ("E".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn test_degenerate_partition_collapses_and_flags() {
        let mut data = dataset(vec![
            row(2, "A", 1.0, None),
            row(2, "B", 1.0, None),
            row(2, "C", 2.0, None),
        ]);
        let report = assign_quantiles(&mut data, &config(QuantileSpec::Count(5))).unwrap();

        assert_eq!(report.degenerate_partitions.len(), 1);
        assert_eq!(report.degenerate_partitions[0].distinct, 2);
        assert_eq!(
            labels_for(&data, 2),
            vec![
                ("A".to_string(), Some(1)),
                ("B".to_string(), Some(1)),
                ("C".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn test_strict_breadth_fails() {
        let mut data = dataset(vec![row(2, "A", 1.0, None), row(2, "B", 1.0, None)]);
        let config = AnalysisConfig {
            strict_breadth: true,
            ..config(QuantileSpec::Count(3))
        };
        let result = assign_quantiles(&mut data, &config);
        assert!(matches!(
            result,
            Err(RondaError::InsufficientBreadth {
                distinct: 1,
                required: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_partitions_independent_per_date() {
        let mut data = dataset(vec![
            row(2, "A", 10.0, None),
            row(2, "B", 20.0, None),
            row(3, "A", -5.0, None),
            row(3, "B", -1.0, None),
        ]);
        assign_quantiles(&mut data, &config(QuantileSpec::Count(2))).unwrap();

        // Each date ranks on its own scale.
        assert_eq!(labels_for(&data, 2)[0].1, Some(1));
        assert_eq!(labels_for(&data, 3)[0].1, Some(1));
        assert_eq!(labels_for(&data, 3)[1].1, Some(2));
    }

    #[test]
    fn test_fixed_edges() {
        let mut data = dataset(vec![
            row(2, "A", -2.0, None), // below range: unlabeled
            row(2, "B", 0.0, None),  // lowest edge inclusive
            row(2, "C", 0.5, None),
            row(2, "D", 1.0, None),  // right-closed
            row(2, "E", 1.5, None),
            row(2, "F", 9.0, None),  // above range: unlabeled
        ]);
        let edges = QuantileSpec::Edges(vec![0.0, 1.0, 2.0]);
        assign_quantiles(&mut data, &config(edges)).unwrap();

        assert_eq!(
            labels_for(&data, 2),
            vec![
                ("A".to_string(), None),
                ("B".to_string(), Some(1)),
                ("C".to_string(), Some(1)),
                ("D".to_string(), Some(1)),
                ("E".to_string(), Some(2)),
                ("F".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_by_group_partitions() {
        let mut data = dataset(vec![
            row(2, "A", 1.0, Some("Tech")),
            row(2, "B", 9.0, Some("Tech")),
            row(2, "C", 2.0, Some("Energy")),
            row(2, "D", 3.0, Some("Energy")),
        ]);
        let config = AnalysisConfig {
            by_group: true,
            ..config(QuantileSpec::Count(2))
        };
        assign_quantiles(&mut data, &config).unwrap();

        // Each group buckets on its own scale: B and D both top their group.
        assert_eq!(
            labels_for(&data, 2),
            vec![
                ("A".to_string(), Some(1)),
                ("B".to_string(), Some(2)),
                ("C".to_string(), Some(1)),
                ("D".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn test_by_group_requires_labels() {
        let mut data = dataset(vec![row(2, "A", 1.0, None)]);
        let config = AnalysisConfig {
            by_group: true,
            ..config(QuantileSpec::Count(2))
        };
        assert!(matches!(
            assign_quantiles(&mut data, &config),
            Err(RondaError::Schema(_))
        ));
    }

    #[test]
    fn test_pooled_edges_share_scale_across_groups() {
        let mut data = dataset(vec![
            row(2, "A", 1.0, Some("Tech")),
            row(2, "B", 2.0, Some("Tech")),
            row(2, "C", 3.0, Some("Energy")),
            row(2, "D", 4.0, Some("Energy")),
        ]);
        let config = AnalysisConfig {
            by_group: true,
            pooled_edges: true,
            ..config(QuantileSpec::Count(2))
        };
        assign_quantiles(&mut data, &config).unwrap();

        // Pooled median is 2.5: all of Tech lands in bucket 1, Energy in 2.
        assert_eq!(
            labels_for(&data, 2),
            vec![
                ("A".to_string(), Some(1)),
                ("B".to_string(), Some(1)),
                ("C".to_string(), Some(2)),
                ("D".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn test_empirical_edges_interpolate() {
        let edges = empirical_edges(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(edges, vec![1.0, 2.5, 4.0]);
    }

    #[test]
    fn test_reassignment_clears_previous_labels() {
        let mut data = dataset(vec![
            row(2, "A", -2.0, None),
            row(2, "B", 2.0, None),
        ]);
        assign_quantiles(&mut data, &config(QuantileSpec::Count(2))).unwrap();
        assert!(data.rows().iter().all(|r| r.quantile.is_some()));

        // Re-run with edges that exclude A: its old label must not survive.
        let edges = QuantileSpec::Edges(vec![0.0, 1.0, 3.0]);
        assign_quantiles(&mut data, &config(edges)).unwrap();
        assert_eq!(data.rows()[0].quantile, None);
        assert_eq!(data.rows()[1].quantile, Some(2));
    }
}
