//! Trading-calendar periodicity inference.

use serde::{Deserialize, Serialize};

use ronda_traits::{Date, Result, RondaError};

/// Granularity of a price panel's trading calendar.
///
/// Inferred from the modal gap (in calendar days) between consecutive
/// panel timestamps, so a daily panel stays daily across weekends and
/// holiday gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Periodicity {
    /// One observation per trading day.
    Daily,
    /// One observation per week.
    Weekly,
    /// One observation per month.
    Monthly,
    /// One observation per quarter.
    Quarterly,
}

impl Periodicity {
    /// Infer the periodicity from a sorted date index.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Schema`] when fewer than two timestamps are
    /// available or the spacing matches no supported calendar.
    pub fn infer(dates: &[Date]) -> Result<Self> {
        if dates.len() < 2 {
            return Err(RondaError::Schema(
                "at least two timestamps are required to infer periodicity".to_string(),
            ));
        }

        // Modal gap; ties resolve to the smaller gap.
        let mut counts: Vec<(i64, usize)> = Vec::new();
        for window in dates.windows(2) {
            let gap = (window[1] - window[0]).num_days();
            match counts.iter_mut().find(|(g, _)| *g == gap) {
                Some((_, count)) => *count += 1,
                None => counts.push((gap, 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let modal_gap = counts[0].0;

        match modal_gap {
            1..=4 => Ok(Self::Daily),
            5..=13 => Ok(Self::Weekly),
            14..=45 => Ok(Self::Monthly),
            46..=120 => Ok(Self::Quarterly),
            _ => Err(RondaError::Schema(format!(
                "cannot infer periodicity from a modal timestamp gap of {modal_gap} days"
            ))),
        }
    }

    /// Periods per year, used for annualization.
    #[must_use]
    pub const fn periods_per_year(&self) -> usize {
        match self {
            Self::Daily => 252,
            Self::Weekly => 52,
            Self::Monthly => 12,
            Self::Quarterly => 4,
        }
    }

    /// Single-letter suffix used in horizon column labels.
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Quarterly => "Q",
        }
    }

    /// Column label for a horizon, e.g. `"5D"` or `"2W"`.
    #[must_use]
    pub fn label(&self, horizon: usize) -> String {
        format!("{horizon}{}", self.suffix())
    }
}
