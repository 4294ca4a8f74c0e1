use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

use nibble_core::models::format_date_iso;
use nibble_core::report::{DISCLAIMER, DailyReport, ReportExporter};
use nibble_core::service::Tracker;

use super::helpers::{format_kcal, parse_date};
use crate::ExportFormat;

/// Plain-text report, one section per block.
pub(crate) struct TextExporter {
    pub dir: PathBuf,
}

/// The report tuple plus the derived lines, as pretty JSON.
pub(crate) struct JsonExporter {
    pub dir: PathBuf,
}

/// Plain-text rendering of a report.
pub(crate) struct TextReport<'a>(pub &'a DailyReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let profile = &report.profile;

        writeln!(f, "Calorie Report")?;
        writeln!(f, "Date: {}", format_date_iso(report.date))?;
        writeln!(f)?;

        writeln!(f, "Profile")?;
        writeln!(f, "  Name: {}", profile.name)?;
        writeln!(f, "  Age: {} years", profile.age)?;
        writeln!(f, "  Weight: {} kg", profile.weight_kg)?;
        writeln!(f, "  Height: {} cm", profile.height_cm)?;
        writeln!(f, "  Calorie goal (TDEE): {} kcal", format_kcal(as_kcal(profile.tdee)))?;
        writeln!(
            f,
            "  Daily target ({}): {} kcal",
            profile.goal.as_str(),
            format_kcal(as_kcal(report.target()))
        )?;
        writeln!(f)?;

        writeln!(f, "Daily summary")?;
        writeln!(f, "  Total consumed: {} kcal", format_kcal(report.total_consumed))?;
        writeln!(f, "  {}", report.difference_line())?;
        writeln!(f, "  Status: {}", report.status_label())?;

        let lines = report.lines();
        if !lines.is_empty() {
            writeln!(f)?;
            writeln!(f, "Foods consumed")?;
            for (i, line) in lines.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, line.name)?;
                writeln!(
                    f,
                    "     {} kcal x {} = {} kcal",
                    format_kcal(line.kcal_per_unit),
                    line.units,
                    format_kcal(line.total)
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{DISCLAIMER}")
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_kcal(kcal: i64) -> f64 {
    kcal as f64
}

fn write_report(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(path)
}

impl ReportExporter for TextExporter {
    fn export(&self, report: &DailyReport) -> Result<PathBuf> {
        let file_name = format!("{}.txt", report.file_stem());
        write_report(&self.dir, &file_name, &TextReport(report).to_string())
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &DailyReport) -> Result<PathBuf> {
        let document = serde_json::json!({
            "profile": {
                "name": report.profile.name,
                "age": report.profile.age,
                "weightKg": report.profile.weight_kg,
                "heightCm": report.profile.height_cm,
                "tdee": report.profile.tdee,
                "goal": report.profile.goal,
            },
            "target": report.target(),
            "date": format_date_iso(report.date),
            "entries": report.entries,
            "lines": report.lines(),
            "totalConsumed": report.total_consumed,
            "difference": report.difference(),
            "status": report.status(),
        });
        let file_name = format!("{}.json", report.file_stem());
        write_report(
            &self.dir,
            &file_name,
            &serde_json::to_string_pretty(&document)?,
        )
    }
}

pub(crate) fn cmd_export(
    tracker: &Tracker,
    date: Option<String>,
    format: ExportFormat,
    dir: &Path,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let session = tracker.session();
    let report = tracker.report(&session, date)?;

    let exporter: Box<dyn ReportExporter> = match format {
        ExportFormat::Text => Box::new(TextExporter {
            dir: dir.to_path_buf(),
        }),
        ExportFormat::Json => Box::new(JsonExporter {
            dir: dir.to_path_buf(),
        }),
    };
    let path = exporter.export(&report).inspect_err(|e| {
        tracing::error!(error = %e, "report export failed");
    })?;

    if json {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("Report written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nibble_core::models::{IntakeEntry, Profile};

    fn report() -> DailyReport {
        let profile: Profile = serde_json::from_str(
            r#"{"id":"p1","name":"Ana","password":"pass","age":25,"weightKg":60.0,"heightCm":165.0,"tdee":1614}"#,
        )
        .unwrap();
        let entries = vec![IntakeEntry {
            id: "entry-1".to_string(),
            date_iso: "2024-06-15".to_string(),
            food_id: None,
            custom_name: Some("Tacos".to_string()),
            kcal_per_unit: 150.0,
            units: 2,
            timestamp: 0,
        }];
        DailyReport::build(
            profile,
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            entries,
            Vec::new(),
        )
    }

    #[test]
    fn test_render_text() {
        let text = TextReport(&report()).to_string();
        assert!(text.starts_with("Calorie Report\nDate: 2024-06-15\n"));
        assert!(text.contains("  Name: Ana\n"));
        assert!(text.contains("  Calorie goal (TDEE): 1,614 kcal\n"));
        assert!(text.contains("  Daily target (maintenance): 1,614 kcal\n"));
        assert!(text.contains("  Total consumed: 300 kcal\n"));
        assert!(text.contains("  Short by: 1314 kcal\n"));
        assert!(text.contains("  Status: Within goal\n"));
        assert!(text.contains("  1. Tacos\n     150 kcal x 2 = 300 kcal\n"));
        assert!(text.trim_end().ends_with(DISCLAIMER));
    }

    #[test]
    fn test_render_text_shows_goal_target() {
        let mut report = report();
        report.profile.goal = nibble_core::models::Goal::Deficit;
        let text = TextReport(&report).to_string();
        assert!(text.contains("  Daily target (deficit): 1,114 kcal\n"));
        assert!(text.contains("  Status: Within goal\n"));
    }

    #[test]
    fn test_text_exporter_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = TextExporter {
            dir: tmp.path().join("reports"),
        };
        let path = exporter.export(&report()).unwrap();
        assert_eq!(
            path,
            tmp.path().join("reports").join("calorie-report-2024-06-15.txt")
        );
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("Tacos"));
    }

    #[test]
    fn test_json_exporter_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = JsonExporter {
            dir: tmp.path().to_path_buf(),
        };
        let path = exporter.export(&report()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["date"], "2024-06-15");
        assert_eq!(value["status"], "ok");
        assert_eq!(value["lines"][0]["name"], "Tacos");
        assert!(value["profile"].get("password").is_none());
        assert_eq!(value["totalConsumed"], 300.0);
        assert_eq!(value["target"], 1614);
    }
}
