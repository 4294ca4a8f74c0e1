//! Daily export report.
//!
//! [`DailyReport`] holds everything an exporter needs; formatting into a file
//! is left to [`ReportExporter`] implementations.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog;
use crate::ledger::total_kcal;
use crate::models::{FoodItem, IntakeEntry, Profile, format_date_iso};
use crate::target::{ProgressState, resolve_target};

pub const DISCLAIMER: &str = "Educational demo. Not a substitute for professional medical advice.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub profile: Profile,
    pub date: NaiveDate,
    pub entries: Vec<IntakeEntry>,
    pub foods: Vec<FoodItem>,
    pub total_consumed: f64,
}

/// One itemized line of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub name: String,
    pub kcal_per_unit: f64,
    pub units: u32,
    pub total: f64,
}

impl DailyReport {
    /// `total_consumed` is recomputed from `entries`.
    #[must_use]
    pub fn build(
        profile: Profile,
        date: NaiveDate,
        entries: Vec<IntakeEntry>,
        foods: Vec<FoodItem>,
    ) -> Self {
        let total_consumed = total_kcal(&entries);
        Self {
            profile,
            date,
            entries,
            foods,
            total_consumed,
        }
    }

    /// The goal-adjusted daily target, as the dashboard uses it.
    #[must_use]
    pub fn target(&self) -> i64 {
        resolve_target(&self.profile)
    }

    /// Consumed minus TDEE; positive when over.
    #[must_use]
    pub fn difference(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let tdee = self.profile.tdee as f64;
        self.total_consumed - tdee
    }

    #[must_use]
    pub fn difference_line(&self) -> String {
        let difference = self.difference();
        let amount = difference.abs().round();
        if difference > 0.0 {
            format!("Over by: {amount:.0} kcal")
        } else {
            format!("Short by: {amount:.0} kcal")
        }
    }

    /// Status against TDEE, not the goal-adjusted [`target`](Self::target),
    /// so a deficit goal can read "Exceeded" on the dashboard while the
    /// report still says "Within goal". `None` when the profile has no TDEE.
    #[must_use]
    pub fn status(&self) -> Option<ProgressState> {
        if self.profile.tdee <= 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let percentage = self.total_consumed / self.profile.tdee as f64 * 100.0;
        Some(ProgressState::from_percentage(percentage))
    }

    #[must_use]
    pub fn status_label(&self) -> &'static str {
        match self.status() {
            Some(ProgressState::Ok) => "Within goal",
            Some(ProgressState::Near) => "Close to goal",
            Some(ProgressState::Over) => "Exceeded",
            None => "No goal set",
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<ReportLine> {
        self.entries
            .iter()
            .map(|entry| ReportLine {
                name: catalog::entry_name(&self.foods, entry),
                kcal_per_unit: entry.kcal_per_unit,
                units: entry.units,
                total: entry.kcal(),
            })
            .collect()
    }

    /// Suggested file stem, e.g. `calorie-report-2024-06-15`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("calorie-report-{}", format_date_iso(self.date))
    }
}

/// Writes a report somewhere and returns where it went.
pub trait ReportExporter {
    fn export(&self, report: &DailyReport) -> anyhow::Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FALLBACK_ENTRY_NAME;

    fn profile(tdee: i64) -> Profile {
        let mut p: Profile =
            serde_json::from_str(r#"{"id":"p1","name":"Ana","password":"pass"}"#).unwrap();
        p.tdee = tdee;
        p
    }

    fn entry(food_id: Option<&str>, custom_name: Option<&str>, kcal: f64, units: u32) -> IntakeEntry {
        IntakeEntry {
            id: "entry-1".to_string(),
            date_iso: "2024-06-15".to_string(),
            food_id: food_id.map(str::to_string),
            custom_name: custom_name.map(str::to_string),
            kcal_per_unit: kcal,
            units,
            timestamp: 0,
        }
    }

    fn foods() -> Vec<FoodItem> {
        vec![FoodItem {
            id: "apple".to_string(),
            name: "Apple".to_string(),
            category: "Fruits".to_string(),
            kcal_per_serving: 95.0,
            serving_name: "1 medium".to_string(),
            is_custom: None,
        }]
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_build_recomputes_total() {
        let report = DailyReport::build(
            profile(2000),
            date(),
            vec![
                entry(Some("apple"), None, 95.0, 2),
                entry(None, Some("Tacos"), 150.0, 3),
            ],
            foods(),
        );
        assert!((report.total_consumed - 640.0).abs() < f64::EPSILON);
        assert_eq!(report.difference_line(), "Short by: 1360 kcal");
        assert_eq!(report.status(), Some(ProgressState::Ok));
        assert_eq!(report.file_stem(), "calorie-report-2024-06-15");
    }

    #[test]
    fn test_entry_names_resolve_in_order() {
        let report = DailyReport::build(
            profile(2000),
            date(),
            vec![
                entry(Some("apple"), Some("ignored"), 95.0, 1),
                entry(Some("deleted-food"), Some("Tacos"), 150.0, 1),
                entry(Some("deleted-food"), None, 150.0, 1),
            ],
            foods(),
        );
        let names: Vec<String> = report.lines().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Apple", "Tacos", FALLBACK_ENTRY_NAME]);
    }

    #[test]
    fn test_status_thresholds() {
        let over = DailyReport::build(
            profile(2000),
            date(),
            vec![entry(None, Some("Feast"), 2200.0, 1)],
            Vec::new(),
        );
        assert_eq!(over.status_label(), "Exceeded");
        assert_eq!(over.difference_line(), "Over by: 200 kcal");

        let near = DailyReport::build(
            profile(2000),
            date(),
            vec![entry(None, Some("Meal"), 2000.0, 1)],
            Vec::new(),
        );
        assert_eq!(near.status_label(), "Close to goal");

        let unset = DailyReport::build(profile(0), date(), Vec::new(), Vec::new());
        assert!(unset.status().is_none());
    }

    #[test]
    fn test_target_follows_goal_while_status_uses_tdee() {
        let mut deficit = profile(1614);
        deficit.goal = crate::models::Goal::Deficit;
        let report = DailyReport::build(
            deficit,
            date(),
            vec![entry(None, Some("Feast"), 1200.0, 1)],
            Vec::new(),
        );
        assert_eq!(report.target(), 1114);
        assert_eq!(report.status(), Some(ProgressState::Ok));
        assert_eq!(report.difference_line(), "Short by: 414 kcal");

        let unset = DailyReport::build(profile(0), date(), Vec::new(), Vec::new());
        assert_eq!(unset.target(), 0);
    }

    #[test]
    fn test_lines_itemize() {
        let report = DailyReport::build(
            profile(2000),
            date(),
            vec![entry(Some("apple"), None, 95.0, 3)],
            foods(),
        );
        let line = &report.lines()[0];
        assert_eq!(line.units, 3);
        assert!((line.total - 285.0).abs() < f64::EPSILON);
    }
}
