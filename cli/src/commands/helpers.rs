use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nibble_core::catalog::FoodCatalog;
use nibble_core::models::{FoodItem, IntakeEntry, Profile};
use nibble_core::target::resolve_target;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

fn read_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line)
}

/// Use the `--password` value, or ask for it on stdin.
pub(crate) fn read_password(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => read_line("Password: "),
    }
}

pub(crate) fn confirm(question: &str) -> Result<bool> {
    let answer = read_line(&format!("{question} [y/N]: "))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub(crate) fn prompt_choice(count: usize) -> Result<usize> {
    let line = read_line(&format!("\nSelect a food (1-{count}): "))?;
    let n: usize = line.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range");
    }
    Ok(n - 1)
}

/// Report a missing record and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) enum FoodMatch<'c> {
    One(&'c FoodItem),
    Many(Vec<&'c FoodItem>),
    NoMatch,
}

/// Look a food up by exact id, then by name search.
pub(crate) fn match_food<'c>(catalog: &'c FoodCatalog<'_>, query: &str) -> FoodMatch<'c> {
    if let Some(food) = catalog.find(query.trim()) {
        return FoodMatch::One(food);
    }
    let mut matches = catalog.search(query, None);
    match matches.len() {
        0 => FoodMatch::NoMatch,
        1 => FoodMatch::One(matches.remove(0)),
        _ => FoodMatch::Many(matches),
    }
}

fn ambiguous_food_message(query: &str, matches: &[&FoodItem]) -> String {
    let ids: Vec<&str> = matches.iter().map(|f| f.id.as_str()).collect();
    format!(
        "'{query}' matches {} foods; pass one of these ids: {}",
        matches.len(),
        ids.join(", ")
    )
}

/// Resolve a food for logging. Several matches prompt for a choice, or
/// under `--json` print the candidate ids and exit with status 2.
pub(crate) fn resolve_food(catalog: &FoodCatalog<'_>, query: &str, json: bool) -> Result<FoodItem> {
    match match_food(catalog, query) {
        FoodMatch::One(food) => Ok(food.clone()),
        FoodMatch::NoMatch => bail!("No food found for '{query}'"),
        FoodMatch::Many(matches) if json => {
            exit_not_found(&ambiguous_food_message(query, &matches), true)
        }
        FoodMatch::Many(matches) => {
            print_food_table(&matches);
            let idx = prompt_choice(matches.len())?;
            Ok(matches[idx].clone())
        }
    }
}

/// Entry at a 1-based position in the day's list.
pub(crate) fn entry_at(entries: &[IntakeEntry], position: usize) -> Option<&IntakeEntry> {
    position.checked_sub(1).and_then(|i| entries.get(i))
}

pub(crate) fn print_food_table(foods: &[&FoodItem]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "kcal")]
        kcal: String,
        #[tabled(rename = "Serving")]
        serving: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: i + 1,
            id: truncate(&f.id, 20),
            name: truncate(&f.name, 35),
            category: f.category.clone(),
            kcal: format!("{:.0}", f.kcal_per_serving),
            serving: truncate(&f.serving_name, 20),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_entry_table(catalog: &FoodCatalog<'_>, entries: &[IntakeEntry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "kcal/unit")]
        per_unit: String,
        #[tabled(rename = "Units")]
        units: u32,
        #[tabled(rename = "Total")]
        total: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| EntryRow {
            idx: i + 1,
            name: truncate(&catalog.entry_name(e), 35),
            per_unit: format!("{:.0}", e.kcal_per_unit),
            units: e.units,
            total: format!("{:.0}", no_neg_zero(e.kcal())),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Profile as shown to the user; never includes the password.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileView<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub sex: &'static str,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity_level: &'static str,
    pub tdee: i64,
    pub goal: &'static str,
    pub target: i64,
    pub setup_complete: bool,
    pub created_at: &'a str,
}

impl<'a> From<&'a Profile> for ProfileView<'a> {
    fn from(p: &'a Profile) -> Self {
        ProfileView {
            id: &p.id,
            name: &p.name,
            sex: p.sex.as_str(),
            age: p.age,
            weight_kg: p.weight_kg,
            height_cm: p.height_cm,
            activity_level: p.activity_level.as_str(),
            tdee: p.tdee,
            goal: p.goal.as_str(),
            target: resolve_target(p),
            setup_complete: p.is_setup_complete(),
            created_at: &p.created_at,
        }
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// Whole calories with thousands separators, e.g. `2,759`.
pub(crate) fn format_kcal(kcal: f64) -> String {
    let rounded = no_neg_zero(kcal.round());
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
