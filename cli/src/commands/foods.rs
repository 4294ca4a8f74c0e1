use anyhow::Result;
use std::process;

use nibble_core::models::NewFood;
use nibble_core::service::Tracker;

use super::helpers::{format_kcal, print_food_table};

pub(crate) fn cmd_foods(
    tracker: &Tracker,
    query: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let session = tracker.session();
    let catalog = tracker.catalog(&session)?;
    let foods = catalog.search(query.unwrap_or_default(), category);

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            match query {
                Some(q) => eprintln!("No foods found for '{q}'"),
                None => eprintln!("No foods found"),
            }
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else {
        print_food_table(&foods);
    }

    Ok(())
}

pub(crate) fn cmd_food_add(
    tracker: &Tracker,
    name: &str,
    calories: f64,
    category: Option<String>,
    serving: Option<String>,
    json: bool,
) -> Result<()> {
    let session = tracker.session();
    let mut catalog = tracker.catalog(&session)?;
    let food = catalog.add_custom_food(&NewFood {
        name: name.to_string(),
        category: category.unwrap_or_default(),
        kcal_per_serving: calories,
        serving_name: serving.unwrap_or_default(),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        println!(
            "Added food: {} ({} kcal per {}, id: {})",
            food.name,
            format_kcal(food.kcal_per_serving),
            food.serving_name,
            food.id
        );
    }

    Ok(())
}

pub(crate) fn cmd_categories(tracker: &Tracker, json: bool) -> Result<()> {
    let session = tracker.session();
    let catalog = tracker.catalog(&session)?;
    let categories = catalog.categories();

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for category in &categories {
            let count = catalog.search("", Some(category.as_str())).len();
            println!("{category} ({count})");
        }
    }

    Ok(())
}
