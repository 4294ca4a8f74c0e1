use anyhow::Result;
use nibble_core::models::format_date_iso;
use nibble_core::service::Tracker;

use super::helpers::{
    confirm, entry_at, exit_not_found, format_kcal, json_error, parse_date, print_entry_table,
    resolve_food,
};

pub(crate) enum UnitsChange {
    Set(i64),
    Increment,
    Decrement,
}

pub(crate) fn cmd_add(
    tracker: &Tracker,
    query: &str,
    units: u32,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let session = tracker.session();
    let food = resolve_food(&tracker.catalog(&session)?, query, json)?;
    let mut ledger = tracker.ledger(&session, date)?;
    let entry = ledger.add_catalog_entry(&food, units);

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "Logged {} x {} ({} kcal) on {}",
            units.max(1),
            food.name,
            format_kcal(food.kcal_per_serving * f64::from(units.max(1))),
            format_date_iso(date)
        );
        if entry.units > units.max(1) {
            println!("  Now {} units in total", entry.units);
        }
        println!("  Day total: {} kcal", format_kcal(ledger.total_kcal()));
    }

    Ok(())
}

pub(crate) fn cmd_manual(
    tracker: &Tracker,
    name: &str,
    calories: f64,
    units: u32,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let session = tracker.session();
    let mut ledger = tracker.ledger(&session, date)?;
    let entry = ledger.add_manual_entry(name, calories, units)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "Logged {} x {} ({} kcal) on {}",
            entry.units,
            entry.custom_name.as_deref().unwrap_or(name),
            format_kcal(entry.kcal()),
            format_date_iso(date)
        );
        println!("  Day total: {} kcal", format_kcal(ledger.total_kcal()));
    }

    Ok(())
}

pub(crate) fn cmd_units(
    tracker: &Tracker,
    position: usize,
    change: UnitsChange,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let session = tracker.session();
    let mut ledger = tracker.ledger(&session, date)?;
    let Some(id) = entry_at(ledger.entries(), position).map(|e| e.id.clone()) else {
        exit_not_found(
            &format!("No entry #{position} on {}", format_date_iso(date)),
            json,
        );
    };

    let updated = match change {
        UnitsChange::Set(units) => ledger.set_units(&id, units),
        UnitsChange::Increment => ledger.increment(&id),
        UnitsChange::Decrement => ledger.decrement(&id),
    };
    let Some(entry) = updated else {
        exit_not_found(&format!("Entry #{position} disappeared"), json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "Entry #{position}: {} units ({} kcal)",
            entry.units,
            format_kcal(entry.kcal())
        );
        println!("  Day total: {} kcal", format_kcal(ledger.total_kcal()));
    }

    Ok(())
}

pub(crate) fn cmd_remove(
    tracker: &Tracker,
    position: usize,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let session = tracker.session();
    let mut ledger = tracker.ledger(&session, date)?;
    let Some(id) = entry_at(ledger.entries(), position).map(|e| e.id.clone()) else {
        exit_not_found(
            &format!("No entry #{position} on {}", format_date_iso(date)),
            json,
        );
    };

    let Some(removed) = ledger.remove_entry(&id) else {
        exit_not_found(&format!("Entry #{position} disappeared"), json);
    };

    if json {
        println!("{}", serde_json::json!({ "deleted": removed }));
    } else {
        println!("Removed entry #{position} ({} kcal)", format_kcal(removed.kcal()));
        println!("  Day total: {} kcal", format_kcal(ledger.total_kcal()));
    }

    Ok(())
}

pub(crate) fn cmd_reset(tracker: &Tracker, date: Option<String>, yes: bool, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let session = tracker.session();
    let mut ledger = tracker.ledger(&session, date)?;
    let count = ledger.entries().len();

    if count == 0 {
        exit_not_found(&format!("No entries for {}", format_date_iso(date)), json);
    }

    if !yes && !confirm(&format!("Remove all {count} entries for {}?", format_date_iso(date)))? {
        if json {
            println!("{}", json_error("Cancelled"));
        } else {
            eprintln!("Cancelled");
        }
        return Ok(());
    }

    ledger.reset_day();

    if json {
        println!(
            "{}",
            serde_json::json!({ "date": format_date_iso(date), "removed": count })
        );
    } else {
        println!("Cleared {count} entries for {}", format_date_iso(date));
    }

    Ok(())
}

/// Dashboard for one day: entries, totals and progress against the target.
pub(crate) fn cmd_day(tracker: &Tracker, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let session = tracker.session();
    let dashboard = tracker.dashboard(&session, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    let date = format_date_iso(dashboard.date);
    println!("=== {} · {date} ===\n", dashboard.profile_name);

    if dashboard.entries.is_empty() {
        println!("  No entries for {date}\n");
    } else {
        let catalog = tracker.catalog(&session)?;
        print_entry_table(&catalog, &dashboard.entries);
        println!();
    }

    let progress = &dashboard.progress;
    println!("  CONSUMED:  {} kcal", format_kcal(progress.consumed));
    #[allow(clippy::cast_precision_loss)]
    let target = progress.target as f64;
    println!("  TARGET:    {} kcal", format_kcal(target));
    println!("  REMAINING: {}", progress.remaining_message());
    if let (Some(percentage), Some(state), Some(band)) =
        (progress.percentage, progress.state, progress.band)
    {
        println!("  PROGRESS:  {percentage:.0}% ({})", state.as_str());
        println!("\n  {}", band.phrase());
    }
    if let Some(message) = dashboard.message {
        println!("  {message}");
    }

    Ok(())
}
