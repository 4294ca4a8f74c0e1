//! Daily calorie target and progress classification.
//!
//! A target of `0` means the profile has no physical data yet. It is never a
//! valid zero-calorie goal, so [`classify`] reports no percentage, state or
//! band for it.

use serde::Serialize;

use crate::models::{Goal, Profile};

/// Upper bound (inclusive) of the `ok` state, in percent of target.
pub const NEAR_THRESHOLD_PCT: f64 = 95.0;
/// Upper bound (inclusive) of the `near` state, in percent of target.
pub const OVER_THRESHOLD_PCT: f64 = 105.0;

#[must_use]
pub fn goal_adjustment(goal: Goal) -> f64 {
    match goal {
        Goal::Deficit => -500.0,
        Goal::Maintenance => 0.0,
        Goal::Surplus => 300.0,
    }
}

#[must_use]
pub fn resolve_target(profile: &Profile) -> i64 {
    if profile.tdee == 0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let tdee = profile.tdee as f64;
    (tdee + goal_adjustment(profile.goal)).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Ok,
    Near,
    Over,
}

impl ProgressState {
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage <= NEAR_THRESHOLD_PCT {
            ProgressState::Ok
        } else if percentage <= OVER_THRESHOLD_PCT {
            ProgressState::Near
        } else {
            ProgressState::Over
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressState::Ok => "ok",
            ProgressState::Near => "near",
            ProgressState::Over => "over",
        }
    }

    #[must_use]
    pub fn messages(self) -> &'static [&'static str] {
        match self {
            ProgressState::Ok => &[
                "You're doing great, keep it up",
                "Excellent progress",
                "Keep up the pace",
                "Great work so far",
            ],
            ProgressState::Near => &[
                "You've almost reached your goal",
                "You're very close",
                "A little more and you're there",
                "Nearly there",
            ],
            ProgressState::Over => &[
                "You went over your goal, tomorrow will be better",
                "Don't worry, tomorrow is a new day",
                "We all have days like this",
                "What matters is to keep trying",
            ],
        }
    }

    /// Pick one of [`Self::messages`] deterministically from a seed (for
    /// example the day of the year).
    #[must_use]
    pub fn message(self, seed: usize) -> &'static str {
        let messages = self.messages();
        messages[seed % messages.len()]
    }
}

/// Finer-grained banding used for user-facing phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBand {
    /// Exactly 0%.
    NotStarted,
    /// Above 0%, below 25%.
    Started,
    /// 25% up to but excluding 50%.
    Quarter,
    /// 50% up to but excluding 75%.
    Half,
    /// 75% up to but excluding 90%.
    ThreeQuarters,
    /// 90% through 100%.
    AlmostThere,
    /// Above 100%.
    Exceeded,
}

impl ProgressBand {
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage <= 0.0 {
            ProgressBand::NotStarted
        } else if percentage < 25.0 {
            ProgressBand::Started
        } else if percentage < 50.0 {
            ProgressBand::Quarter
        } else if percentage < 75.0 {
            ProgressBand::Half
        } else if percentage < 90.0 {
            ProgressBand::ThreeQuarters
        } else if percentage <= 100.0 {
            ProgressBand::AlmostThere
        } else {
            ProgressBand::Exceeded
        }
    }

    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            ProgressBand::NotStarted => "Nothing logged yet. Start by adding your first meal",
            ProgressBand::Started => "Good start to the day",
            ProgressBand::Quarter => "A quarter of the way there",
            ProgressBand::Half => "Halfway to your goal",
            ProgressBand::ThreeQuarters => "Three quarters done, keep going",
            ProgressBand::AlmostThere => "Almost at your goal",
            ProgressBand::Exceeded => "You have gone past your goal for today",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub consumed: f64,
    pub target: i64,
    /// Raw, unclamped. `None` when the target is 0.
    pub percentage: Option<f64>,
    /// `target - consumed`; negative when over.
    pub remaining: f64,
    pub state: Option<ProgressState>,
    pub band: Option<ProgressBand>,
}

impl Progress {
    /// "X kcal remaining" or "X kcal over", rounded to whole calories.
    #[must_use]
    pub fn remaining_message(&self) -> String {
        let amount = self.remaining.abs().round();
        if self.remaining < 0.0 {
            format!("{amount:.0} kcal over")
        } else {
            format!("{amount:.0} kcal remaining")
        }
    }
}

#[must_use]
pub fn classify(consumed: f64, target: i64) -> Progress {
    #[allow(clippy::cast_precision_loss)]
    let target_kcal = target as f64;
    let remaining = target_kcal - consumed;
    if target <= 0 {
        return Progress {
            consumed,
            target,
            percentage: None,
            remaining,
            state: None,
            band: None,
        };
    }
    let percentage = consumed / target_kcal * 100.0;
    Progress {
        consumed,
        target,
        percentage: Some(percentage),
        remaining,
        state: Some(ProgressState::from_percentage(percentage)),
        band: Some(ProgressBand::from_percentage(percentage)),
    }
}
