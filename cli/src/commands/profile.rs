use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nibble_core::error::TrackerError;
use nibble_core::models::{Goal, PhysicalData};
use nibble_core::service::Tracker;
use nibble_core::target::resolve_target;

use super::helpers::{ProfileView, confirm, exit_not_found, format_kcal, json_error, read_password};

pub(crate) fn cmd_register(
    tracker: &Tracker,
    name: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = read_password(password)?;
    let profile = tracker.directory().register(name, &password)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ProfileView::from(&profile))?);
    } else {
        println!("Registered {} and logged in", profile.name);
        println!("Next: run `nibble setup` to calculate your daily target");
    }

    Ok(())
}

pub(crate) fn cmd_login(
    tracker: &Tracker,
    name: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = read_password(password)?;
    let profile = match tracker.directory().login(name, &password) {
        Ok(p) => p,
        Err(e @ TrackerError::NotFound(_)) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ProfileView::from(&profile))?);
    } else {
        println!("Logged in as {}", profile.name);
        if !profile.is_setup_complete() {
            println!("Your physical data is missing. Run `nibble setup` first");
        }
    }

    Ok(())
}

pub(crate) fn cmd_logout(tracker: &Tracker, json: bool) -> Result<()> {
    let session = tracker.session();
    tracker.directory().logout();

    if json {
        let name = session.profile().map(|p| p.name.as_str());
        println!("{}", serde_json::json!({ "loggedOut": name }));
    } else if let Some(profile) = session.profile() {
        println!("Logged out {}", profile.name);
    } else {
        println!("Nobody was logged in");
    }

    Ok(())
}

pub(crate) fn cmd_whoami(tracker: &Tracker, json: bool) -> Result<()> {
    let session = tracker.session();
    let Some(profile) = session.profile() else {
        exit_not_found("Not logged in", json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ProfileView::from(profile))?);
        return Ok(());
    }

    println!("{} ({})", profile.name, profile.id);
    if profile.is_setup_complete() {
        println!(
            "  {}, {} years, {} kg, {} cm, {}",
            profile.sex.as_str(),
            profile.age,
            profile.weight_kg,
            profile.height_cm,
            profile.activity_level.as_str()
        );
        println!("  TDEE:   {} kcal", format_kcal(as_kcal(profile.tdee)));
        println!(
            "  TARGET: {} kcal ({})",
            format_kcal(as_kcal(resolve_target(profile))),
            profile.goal.as_str()
        );
    } else {
        println!("  Setup incomplete. Run `nibble setup`");
    }

    Ok(())
}

pub(crate) fn cmd_profiles(tracker: &Tracker, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ProfileRow {
        #[tabled(rename = "")]
        active: &'static str,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Goal")]
        goal: &'static str,
        #[tabled(rename = "TDEE")]
        tdee: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let directory = tracker.directory();
    let profiles = directory.profiles();
    let active_id = directory.active_profile_id();

    if profiles.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No profiles yet. Create one with `nibble register <name>`");
        }
        process::exit(2);
    }

    if json {
        let views: Vec<ProfileView<'_>> = profiles.iter().map(ProfileView::from).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            active: if active_id.as_deref() == Some(p.id.as_str()) {
                "*"
            } else {
                ""
            },
            name: p.name.clone(),
            goal: p.goal.as_str(),
            tdee: if p.is_setup_complete() {
                format_kcal(as_kcal(p.tdee))
            } else {
                "-".to_string()
            },
            created: p.created_at.chars().take(10).collect(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_delete_profile(
    tracker: &Tracker,
    name: &str,
    yes: bool,
    json: bool,
) -> Result<()> {
    let directory = tracker.directory();
    let Some(profile) = directory
        .profiles()
        .into_iter()
        .find(|p| p.matches_name(name.trim()))
    else {
        exit_not_found(&format!("No profile named '{name}'"), json);
    };

    if !yes
        && !confirm(&format!(
            "Delete profile '{}' and all of its data?",
            profile.name
        ))?
    {
        if json {
            println!("{}", json_error("Cancelled"));
        } else {
            eprintln!("Cancelled");
        }
        return Ok(());
    }

    let report = directory.delete_profile(&profile.id);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Deleted profile {} ({} stored days and lists removed)",
            profile.name,
            report.keys_removed.len()
        );
        if !report.keys_failed.is_empty() {
            eprintln!(
                "Warning: {} keys could not be removed: {}",
                report.keys_failed.len(),
                report.keys_failed.join(", ")
            );
        }
    }

    Ok(())
}

pub(crate) fn cmd_setup(tracker: &Tracker, data: &PhysicalData, json: bool) -> Result<()> {
    let (profile, energy) = tracker.directory().complete_registration(data)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "bmr": energy.bmr,
                "tdee": energy.tdee,
                "profile": ProfileView::from(&profile),
            })
        );
    } else {
        println!("Profile updated for {}", profile.name);
        println!("  BMR:    {} kcal", format_kcal(as_kcal(energy.bmr)));
        println!("  TDEE:   {} kcal", format_kcal(as_kcal(energy.tdee)));
        println!(
            "  TARGET: {} kcal ({})",
            format_kcal(as_kcal(resolve_target(&profile))),
            profile.goal.as_str()
        );
    }

    Ok(())
}

pub(crate) fn cmd_goal(tracker: &Tracker, goal: Goal, json: bool) -> Result<()> {
    let profile = tracker.directory().set_goal(goal)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ProfileView::from(&profile))?);
    } else {
        println!("Goal set to {}", profile.goal.as_str());
        if profile.is_setup_complete() {
            println!(
                "  TARGET: {} kcal",
                format_kcal(as_kcal(resolve_target(&profile)))
            );
        }
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn as_kcal(kcal: i64) -> f64 {
    kcal as f64
}
