use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Acceptance bounds used by registration completion.
pub const MIN_AGE: u32 = 13;
pub const MIN_WEIGHT_KG: f64 = 30.0;
pub const MIN_HEIGHT_CM: f64 = 120.0;

pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    #[default]
    Sedentary,
    Light,
    Moderate,
    Intense,
    VeryIntense,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Intense,
        ActivityLevel::VeryIntense,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Intense => "intense",
            ActivityLevel::VeryIntense => "very_intense",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Deficit,
    #[default]
    Maintenance,
    Surplus,
}

impl Goal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::Deficit => "deficit",
            Goal::Maintenance => "maintenance",
            Goal::Surplus => "surplus",
        }
    }
}

impl Sex {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            other => Err(TrackerError::validation(format!(
                "Invalid sex '{other}'. Use male or female"
            ))),
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ActivityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| {
                TrackerError::validation(format!(
                    "Invalid activity level '{s}'. Use sedentary, light, moderate, intense or very_intense"
                ))
            })
    }
}

impl FromStr for Goal {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deficit" => Ok(Goal::Deficit),
            "maintenance" => Ok(Goal::Maintenance),
            "surplus" => Ok(Goal::Surplus),
            other => Err(TrackerError::validation(format!(
                "Invalid goal '{other}'. Use deficit, maintenance or surplus"
            ))),
        }
    }
}

/// A user profile as persisted under the `profiles` key.
///
/// Fields added after the first schema version carry serde defaults, so a
/// record written by an older build reads back with the documented values
/// (for example `goal` falls back to maintenance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub height_cm: f64,
    #[serde(default, alias = "activity")]
    pub activity_level: ActivityLevel,
    /// `0` until registration is completed.
    #[serde(default)]
    pub tdee: i64,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default)]
    pub created_at: String,
}

impl Profile {
    #[must_use]
    pub fn is_setup_complete(&self) -> bool {
        self.tdee > 0
    }

    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Partial update merged into the active profile. `None` leaves a field as-is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub sex: Option<Sex>,
    pub age: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub tdee: Option<i64>,
    pub goal: Option<Goal>,
}

impl ProfileUpdate {
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = name.trim().to_string();
        }
        if let Some(sex) = self.sex {
            profile.sex = sex;
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(w) = self.weight_kg {
            profile.weight_kg = w;
        }
        if let Some(h) = self.height_cm {
            profile.height_cm = h;
        }
        if let Some(activity) = self.activity_level {
            profile.activity_level = activity;
        }
        if let Some(tdee) = self.tdee {
            profile.tdee = tdee;
        }
        if let Some(goal) = self.goal {
            profile.goal = goal;
        }
    }
}

/// Body and activity inputs collected when completing registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalData {
    pub sex: Sex,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity_level: ActivityLevel,
}

impl PhysicalData {
    pub fn validate(&self) -> Result<()> {
        let below = |value: f64, min: f64| value.is_nan() || value < min;
        if self.age < MIN_AGE
            || below(self.weight_kg, MIN_WEIGHT_KG)
            || below(self.height_cm, MIN_HEIGHT_CM)
        {
            return Err(TrackerError::validation(format!(
                "Enter valid values for age (min {MIN_AGE}), weight (min {MIN_WEIGHT_KG} kg) and height (min {MIN_HEIGHT_CM} cm)"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeEntry {
    pub id: String,
    #[serde(rename = "dateISO")]
    pub date_iso: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    pub kcal_per_unit: f64,
    pub units: u32,
    /// Epoch milliseconds at creation.
    pub timestamp: i64,
}

impl IntakeEntry {
    #[must_use]
    pub fn kcal(&self) -> f64 {
        self.kcal_per_unit * f64::from(self.units)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub kcal_per_serving: f64,
    pub serving_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_custom: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub category: String,
    pub kcal_per_serving: f64,
    pub serving_name: String,
}

/// One day of the history window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub kcal: f64,
    pub goal: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub days: usize,
    pub average: f64,
    pub days_under: usize,
    pub days_over: usize,
    pub has_data: bool,
}

pub fn parse_date_iso(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| TrackerError::validation(format!("Invalid date '{s}'. Must be YYYY-MM-DD")))
}

#[must_use]
pub fn format_date_iso(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
