use chrono::{Days, NaiveDate};

use crate::error::{Result, TrackerError};
use crate::ledger::total_kcal;
use crate::models::{HistoryPoint, HistorySummary, IntakeEntry};
use crate::store::{Store, intake_key};
use crate::target::{NEAR_THRESHOLD_PCT, OVER_THRESHOLD_PCT};

/// The days shown by the history view.
pub const DEFAULT_WINDOW_DAYS: u32 = 5;
/// Longest window `build_window` will read.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// One point per day for the `days` days ending at `today`, oldest first.
/// Days with no ledger count as zero. `days` is capped at
/// [`MAX_WINDOW_DAYS`].
#[must_use]
pub fn build_window(
    store: &Store,
    profile_id: &str,
    goal: i64,
    days: u32,
    today: NaiveDate,
) -> Vec<HistoryPoint> {
    (0..days.min(MAX_WINDOW_DAYS))
        .rev()
        .filter_map(|i| today.checked_sub_days(Days::new(u64::from(i))))
        .map(|date| {
            let entries: Vec<IntakeEntry> = store.read_list(&intake_key(profile_id, date));
            HistoryPoint {
                date,
                kcal: total_kcal(&entries),
                goal,
            }
        })
        .collect()
}

#[must_use]
pub fn summarize(points: &[HistoryPoint]) -> HistorySummary {
    if points.is_empty() {
        return HistorySummary {
            days: 0,
            average: 0.0,
            days_under: 0,
            days_over: 0,
            has_data: false,
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let goal_of = |p: &HistoryPoint| p.goal as f64;
    let total: f64 = points.iter().map(|p| p.kcal).sum();
    #[allow(clippy::cast_precision_loss)]
    let average = total / points.len() as f64;

    HistorySummary {
        days: points.len(),
        average,
        days_under: points
            .iter()
            .filter(|p| p.kcal < goal_of(p) * NEAR_THRESHOLD_PCT / 100.0)
            .count(),
        days_over: points
            .iter()
            .filter(|p| p.kcal > goal_of(p) * OVER_THRESHOLD_PCT / 100.0)
            .count(),
        has_data: points.iter().any(|p| p.kcal > 0.0),
    }
}

/// Entries of a single past or current day.
pub fn day_ledger(
    store: &Store,
    profile_id: &str,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<IntakeEntry>> {
    if date > today {
        return Err(TrackerError::FutureDate(date));
    }
    Ok(store.read_list(&intake_key(profile_id, date)))
}
