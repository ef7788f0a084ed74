//! Sampling-frequency inference for time indexes.
//!
//! The walk-forward engine counts windows in rows, so the calendar meaning of
//! a "step" depends on how the data was sampled. This module recognises the
//! common regular frequencies and provides the monthly sanity check the engine
//! runs before iterating.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

const DAY_SECS: i64 = 86_400;

/// Regular sampling frequency of a time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Every calendar day.
    Daily,
    /// Weekdays only.
    BusinessDaily,
    Weekly,
    /// First day of each month.
    MonthStart,
    /// Last day of each month.
    MonthEnd,
    /// Same day-of-month every month.
    Monthly,
    QuarterEnd,
    YearEnd,
    /// Fixed spacing in seconds.
    Custom(i64),
}

impl Frequency {
    /// Number of periods in a year, for annualizing statistics.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Frequency::Daily => 365.0,
            Frequency::BusinessDaily => 252.0,
            Frequency::Weekly => 52.0,
            Frequency::MonthStart | Frequency::MonthEnd | Frequency::Monthly => 12.0,
            Frequency::QuarterEnd => 4.0,
            Frequency::YearEnd => 1.0,
            Frequency::Custom(secs) => 365.25 * DAY_SECS as f64 / *secs as f64,
        }
    }

    pub fn is_monthly(&self) -> bool {
        matches!(
            self,
            Frequency::MonthStart | Frequency::MonthEnd | Frequency::Monthly
        )
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::BusinessDaily => write!(f, "business daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::MonthStart => write!(f, "month start"),
            Frequency::MonthEnd => write!(f, "month end"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::QuarterEnd => write!(f, "quarter end"),
            Frequency::YearEnd => write!(f, "year end"),
            Frequency::Custom(secs) => write!(f, "every {}s", secs),
        }
    }
}

fn month_key(ts: &DateTime<Utc>) -> i64 {
    ts.year() as i64 * 12 + ts.month0() as i64
}

fn is_month_end(ts: &DateTime<Utc>) -> bool {
    (ts.date_naive() + Duration::days(1)).day() == 1
}

/// Infer the regular frequency of a sorted index.
///
/// Needs at least three timestamps. Returns `None` when the spacing is
/// irregular.
pub fn infer_frequency(index: &[DateTime<Utc>]) -> Option<Frequency> {
    if index.len() < 3 {
        return None;
    }

    let gaps: Vec<i64> = index
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds())
        .collect();
    if gaps.iter().any(|&g| g <= 0) {
        return None;
    }

    // Calendar-anchored frequencies have uneven gaps in seconds
    let same_time = index.iter().all(|t| t.time() == index[0].time());
    if same_time {
        let month_steps: Vec<i64> = index
            .windows(2)
            .map(|w| month_key(&w[1]) - month_key(&w[0]))
            .collect();
        let steps_of = |n: i64| month_steps.iter().all(|&m| m == n);

        if index.iter().all(is_month_end) {
            if steps_of(1) {
                return Some(Frequency::MonthEnd);
            }
            if steps_of(3) && index.iter().all(|t| t.month() % 3 == 0) {
                return Some(Frequency::QuarterEnd);
            }
            if steps_of(12) && index.iter().all(|t| t.month() == 12) {
                return Some(Frequency::YearEnd);
            }
        }
        if steps_of(1) && index.iter().all(|t| t.day() == 1) {
            return Some(Frequency::MonthStart);
        }
        if steps_of(1) && index.iter().all(|t| t.day() == index[0].day()) {
            return Some(Frequency::Monthly);
        }
    }

    let first = gaps[0];
    if gaps.iter().all(|&g| g == first) {
        return Some(match first {
            DAY_SECS => Frequency::Daily,
            s if s == 7 * DAY_SECS => Frequency::Weekly,
            s => Frequency::Custom(s),
        });
    }

    let weekdays_only = index
        .iter()
        .all(|t| !matches!(t.weekday(), Weekday::Sat | Weekday::Sun));
    let business_gaps = index.windows(2).all(|w| {
        let gap = (w[1] - w[0]).num_seconds();
        gap == DAY_SECS || (gap == 3 * DAY_SECS && w[0].weekday() == Weekday::Fri)
    });
    if weekdays_only && business_gaps {
        return Some(Frequency::BusinessDaily);
    }

    None
}

/// Check whether the index looks monthly and warn if it cannot be confirmed.
///
/// When a regular frequency can be inferred the data is trusted as-is.
/// Otherwise the first gap must be 28 to 31 days. Returns `true` when the
/// warning was emitted. Never changes how the index is used.
pub fn check_monthly(index: &[DateTime<Utc>]) -> bool {
    if index.len() < 2 || infer_frequency(index).is_some() {
        return false;
    }

    let days = (index[1] - index[0]).num_days();
    if (28..=31).contains(&days) {
        return false;
    }

    warn!("Could not infer frequency. Assuming data is monthly.");
    true
}
