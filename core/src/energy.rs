//! Basal metabolic rate and total daily energy expenditure.

use serde::Serialize;

use crate::models::{ActivityLevel, PhysicalData, Sex};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Energy {
    /// BMR rounded for display.
    pub bmr: i64,
    pub tdee: i64,
}

#[must_use]
pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.20,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Intense => 1.725,
        ActivityLevel::VeryIntense => 1.90,
    }
}

/// Mifflin-St Jeor BMR, unrounded.
#[must_use]
pub fn basal_metabolic_rate(sex: Sex, age: u32, weight_kg: f64, height_cm: f64) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    match sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

/// Inputs are not validated here; see [`PhysicalData::validate`].
#[must_use]
pub fn compute_energy(
    sex: Sex,
    age: u32,
    weight_kg: f64,
    height_cm: f64,
    activity: ActivityLevel,
) -> Energy {
    let bmr = basal_metabolic_rate(sex, age, weight_kg, height_cm);
    // The multiplier applies to the unrounded BMR.
    let tdee = (bmr * activity_multiplier(activity)).round() as i64;
    Energy {
        bmr: bmr.round() as i64,
        tdee,
    }
}

#[must_use]
pub fn compute_energy_for(data: &PhysicalData) -> Energy {
    compute_energy(
        data.sex,
        data.age,
        data.weight_kg,
        data.height_cm,
        data.activity_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_male_moderate() {
        // 10*80 + 6.25*180 - 5*30 + 5 = 1780
        let e = compute_energy(Sex::Male, 30, 80.0, 180.0, ActivityLevel::Moderate);
        assert_eq!(e.bmr, 1780);
        // 1780 * 1.55 = 2759
        assert_eq!(e.tdee, 2759);
    }

    #[test]
    fn test_female_sedentary() {
        // 10*60 + 6.25*165 - 5*25 - 161 = 1345.25
        let e = compute_energy(Sex::Female, 25, 60.0, 165.0, ActivityLevel::Sedentary);
        assert_eq!(e.bmr, 1345);
        // 1345.25 * 1.2 = 1614.3
        assert_eq!(e.tdee, 1614);
    }

    #[test]
    fn test_multiplier_applied_to_unrounded_bmr() {
        // BMR = 10*61 + 6.25*162 - 5*20 - 161 = 1361.5 (display 1362)
        let e = compute_energy(Sex::Female, 20, 61.0, 162.0, ActivityLevel::VeryIntense);
        assert_eq!(e.bmr, 1362);
        // 1361.5 * 1.9 = 2586.85 -> 2587, while 1362 * 1.9 = 2587.8 -> 2588
        assert_eq!(e.tdee, 2587);
    }

    #[test]
    fn test_multiplier_table() {
        assert!((activity_multiplier(ActivityLevel::Sedentary) - 1.2).abs() < f64::EPSILON);
        assert!((activity_multiplier(ActivityLevel::Light) - 1.375).abs() < f64::EPSILON);
        assert!((activity_multiplier(ActivityLevel::Moderate) - 1.55).abs() < f64::EPSILON);
        assert!((activity_multiplier(ActivityLevel::Intense) - 1.725).abs() < f64::EPSILON);
        assert!((activity_multiplier(ActivityLevel::VeryIntense) - 1.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deterministic_for_all_levels() {
        for level in ActivityLevel::ALL {
            let a = compute_energy(Sex::Male, 40, 75.5, 172.0, level);
            let b = compute_energy(Sex::Male, 40, 75.5, 172.0, level);
            assert_eq!(a, b);
            let bmr = basal_metabolic_rate(Sex::Male, 40, 75.5, 172.0);
            assert_eq!(a.tdee, (bmr * activity_multiplier(level)).round() as i64);
        }
    }
}
