use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nibble_core::models::format_date_iso;
use nibble_core::service::Tracker;
use nibble_core::target::ProgressState;

use super::helpers::format_kcal;

pub(crate) fn cmd_history(tracker: &Tracker, days: u32, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Goal")]
        goal: String,
        #[tabled(rename = "%")]
        percent: String,
        #[tabled(rename = "Status")]
        status: &'static str,
    }

    let session = tracker.session();
    let history = tracker.history(&session, Some(days))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if !history.summary.has_data {
        eprintln!("No entries in the last {days} days");
        process::exit(2);
    }

    let rows: Vec<HistoryRow> = history
        .points
        .iter()
        .map(|p| {
            #[allow(clippy::cast_precision_loss)]
            let goal = p.goal as f64;
            let percentage = if p.goal > 0 {
                Some(p.kcal / goal * 100.0)
            } else {
                None
            };
            HistoryRow {
                date: format_date_iso(p.date),
                calories: format_kcal(p.kcal),
                goal: format_kcal(goal),
                percent: percentage.map_or("-".into(), |v| format!("{v:.0}%")),
                status: percentage.map_or("", |v| ProgressState::from_percentage(v).as_str()),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let summary = &history.summary;
    println!("  Daily average: {} kcal", format_kcal(summary.average));
    println!("  Days under goal: {} of {}", summary.days_under, summary.days);
    println!("  Days over goal:  {} of {}", summary.days_over, summary.days);

    Ok(())
}
