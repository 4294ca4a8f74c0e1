mod commands;
mod config;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    UnitsChange, cmd_add, cmd_categories, cmd_day, cmd_delete_profile, cmd_export, cmd_food_add,
    cmd_foods, cmd_goal, cmd_history, cmd_login, cmd_logout, cmd_manual, cmd_profiles,
    cmd_register, cmd_remove, cmd_reset, cmd_setup, cmd_units, cmd_whoami,
};
use crate::config::Config;
use nibble_core::history::MAX_WINDOW_DAYS;
use nibble_core::models::{ActivityLevel, Goal, PhysicalData, Sex};
use nibble_core::service::Tracker;

#[derive(Parser)]
#[command(
    name = "nibble",
    version,
    about = "A local calorie tracker with multiple profiles",
    long_about = "\n\n  nibble: log what you eat, see where you stand.\n"
)]
struct Cli {
    /// Store data in this directory instead of the platform default
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a profile and log in as it
    Register {
        /// Profile name (unique, case-insensitive)
        name: String,
        /// Password (prompted on stdin when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in to an existing profile
    Login {
        /// Profile name
        name: String,
        /// Password (prompted on stdin when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log out (profile data is kept)
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active profile
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all profiles
    Profiles {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a profile together with its intake history and custom foods
    DeleteProfile {
        /// Profile name
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enter physical data and calculate the daily calorie target
    Setup {
        /// male or female
        #[arg(long)]
        sex: Sex,
        /// Age in years (min 13)
        #[arg(long)]
        age: u32,
        /// Weight in kg (min 30)
        #[arg(long)]
        weight: f64,
        /// Height in cm (min 120)
        #[arg(long)]
        height: f64,
        /// sedentary, light, moderate, intense, very_intense
        #[arg(long, default_value = "sedentary")]
        activity: ActivityLevel,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the calorie goal: deficit (-500), maintenance or surplus (+300)
    Goal {
        goal: Goal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the food catalog
    Foods {
        /// Search query (name substring)
        query: Option<String>,
        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage custom foods
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// List food categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a catalog food by id or name
    Add {
        /// Food id or search query
        food: String,
        /// Number of servings
        #[arg(short, long, default_value = "1")]
        units: u32,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a free-text food with its calories
    Manual {
        /// Food name
        name: String,
        /// Calories per unit
        #[arg(long)]
        calories: f64,
        /// Number of units
        #[arg(short, long, default_value = "1")]
        units: u32,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the units of a logged entry
    #[command(group(ArgGroup::new("change").required(true).args(["set", "inc", "dec"])))]
    Units {
        /// Entry number as shown by `day`
        position: usize,
        /// Set units to this value (floored at 1)
        #[arg(long)]
        set: Option<i64>,
        /// Add one unit
        #[arg(long)]
        inc: bool,
        /// Remove one unit (never below 1)
        #[arg(long)]
        dec: bool,
        /// Date of the entry (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a logged entry
    Remove {
        /// Entry number as shown by `day`
        position: usize,
        /// Date of the entry (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear every entry of a day
    Reset {
        /// Date to clear (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show today's intake and progress
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show intake and progress for a past day
    Day {
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show intake for the last N days
    History {
        /// Number of days to show (1-366)
        #[arg(
            short,
            long,
            default_value = "5",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
        )]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a daily report to the reports directory
    Export {
        /// Date to export (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ExportFormat,
        /// Write to this directory instead of the reports directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a custom food to the active profile's catalog
    Add {
        /// Food name
        name: String,
        /// Calories per serving
        #[arg(long)]
        calories: f64,
        /// Category (default: Custom)
        #[arg(long)]
        category: Option<String>,
        /// Serving description, e.g. "1 cup" (default: 1 serving)
        #[arg(long)]
        serving: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ExportFormat {
    Text,
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;
    let tracker = Tracker::new(&config.db_path)?;
    tracing::debug!(db = %config.db_path.display(), "opened tracker");

    match cli.command {
        Commands::Register {
            name,
            password,
            json,
        } => cmd_register(&tracker, &name, password, json),
        Commands::Login {
            name,
            password,
            json,
        } => cmd_login(&tracker, &name, password, json),
        Commands::Logout { json } => cmd_logout(&tracker, json),
        Commands::Whoami { json } => cmd_whoami(&tracker, json),
        Commands::Profiles { json } => cmd_profiles(&tracker, json),
        Commands::DeleteProfile { name, yes, json } => {
            cmd_delete_profile(&tracker, &name, yes, json)
        }
        Commands::Setup {
            sex,
            age,
            weight,
            height,
            activity,
            json,
        } => {
            let data = PhysicalData {
                sex,
                age,
                weight_kg: weight,
                height_cm: height,
                activity_level: activity,
            };
            cmd_setup(&tracker, &data, json)
        }
        Commands::Goal { goal, json } => cmd_goal(&tracker, goal, json),
        Commands::Foods {
            query,
            category,
            json,
        } => cmd_foods(&tracker, query.as_deref(), category.as_deref(), json),
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                category,
                serving,
                json,
            } => cmd_food_add(&tracker, &name, calories, category, serving, json),
        },
        Commands::Categories { json } => cmd_categories(&tracker, json),
        Commands::Add {
            food,
            units,
            date,
            json,
        } => cmd_add(&tracker, &food, units, date, json),
        Commands::Manual {
            name,
            calories,
            units,
            date,
            json,
        } => cmd_manual(&tracker, &name, calories, units, date, json),
        Commands::Units {
            position,
            set,
            inc,
            dec: _,
            date,
            json,
        } => {
            let change = match (set, inc) {
                (Some(units), _) => UnitsChange::Set(units),
                (None, true) => UnitsChange::Increment,
                (None, false) => UnitsChange::Decrement,
            };
            cmd_units(&tracker, position, change, date, json)
        }
        Commands::Remove {
            position,
            date,
            json,
        } => cmd_remove(&tracker, position, date, json),
        Commands::Reset { date, yes, json } => cmd_reset(&tracker, date, yes, json),
        Commands::Today { json } => cmd_day(&tracker, None, json),
        Commands::Day { date, json } => cmd_day(&tracker, date, json),
        Commands::History { days, json } => cmd_history(&tracker, days, json),
        Commands::Export {
            date,
            format,
            output,
            json,
        } => {
            let dir = match output {
                Some(dir) => dir,
                None => config.ensure_reports_dir()?.clone(),
            };
            cmd_export(&tracker, date, format, &dir, json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_days_bounds() {
        let parse = |days: &str| Cli::try_parse_from(["nibble", "history", "--days", days]);
        assert!(parse("0").is_err());
        assert!(parse("367").is_err());
        assert!(parse("4294967295").is_err());
        let cli = parse("366").unwrap();
        assert!(matches!(cli.command, Commands::History { days: 366, .. }));
    }
}
