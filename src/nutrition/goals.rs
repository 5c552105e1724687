// ABOUTME: Daily macro goal derivation from the onboarding profile
// ABOUTME: Mifflin-St Jeor BMR scaled by activity factor and goal adjustment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! Daily goal derivation
//!
//! Turns a [`UserProfile`] into concrete daily macro targets. The calorie
//! target is the Mifflin-St Jeor basal metabolic rate scaled by the standard
//! activity multiplier, shifted by the selected weight goal. Macro targets
//! split that budget 30/40/30 across protein, carbohydrates, and fat.

use chrono::NaiveDate;

use crate::models::{DailyGoals, Gender, GoalKind, UserProfile};

/// Caloric shift applied for a weight-loss goal
const LOSS_ADJUSTMENT_KCAL: f64 = -500.0;

/// Caloric shift applied for a weight-gain goal
const GAIN_ADJUSTMENT_KCAL: f64 = 300.0;

/// Floor below which the calorie target is never pushed
const MIN_CALORIES: f64 = 1200.0;

/// Kilocalories per gram of protein and carbohydrate
const KCAL_PER_G_PROTEIN_CARB: f64 = 4.0;

/// Kilocalories per gram of fat
const KCAL_PER_G_FAT: f64 = 9.0;

/// Derive daily macro goals from a user profile
#[must_use]
pub fn daily_goals_for(profile: &UserProfile, today: NaiveDate) -> DailyGoals {
    let age = f64::from(profile.age_years(today));

    // Mifflin-St Jeor
    let bmr = 10.0 * profile.weight_kg + 6.25 * profile.height_cm - 5.0 * age
        + match profile.gender {
            Gender::Male => 5.0,
            Gender::Female => -161.0,
        };

    let maintenance = bmr * profile.activity_level.factor();

    let adjustment = match profile.goal {
        GoalKind::LoseWeight => LOSS_ADJUSTMENT_KCAL,
        GoalKind::Maintain => 0.0,
        GoalKind::GainWeight => GAIN_ADJUSTMENT_KCAL,
    };

    let calories = (maintenance + adjustment).max(MIN_CALORIES).round();

    DailyGoals {
        calories,
        proteins: (calories * 0.30 / KCAL_PER_G_PROTEIN_CARB).round(),
        carbs: (calories * 0.40 / KCAL_PER_G_PROTEIN_CARB).round(),
        fats: (calories * 0.30 / KCAL_PER_G_FAT).round(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::ActivityLevel;

    fn profile() -> UserProfile {
        UserProfile {
            user_id: "u-1".to_owned(),
            gender: Gender::Male,
            birth_date: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            height_cm: 180.0,
            weight_kg: 80.0,
            goal: GoalKind::Maintain,
            activity_level: ActivityLevel::Moderate,
        }
    }

    #[test]
    fn test_maintenance_goals_for_reference_profile() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let goals = daily_goals_for(&profile(), today);

        // BMR = 800 + 1125 - 175 + 5 = 1755; x1.55 = 2720.25
        assert!((goals.calories - 2720.0).abs() < 1.0);
        assert!(goals.proteins > 0.0);
        assert!(goals.carbs > goals.proteins);
    }

    #[test]
    fn test_loss_goal_reduces_calories() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let mut p = profile();
        let maintain = daily_goals_for(&p, today);
        p.goal = GoalKind::LoseWeight;
        let lose = daily_goals_for(&p, today);

        assert!((maintain.calories - lose.calories - 500.0).abs() < 1.0);
    }

    #[test]
    fn test_calorie_floor_holds() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let p = UserProfile {
            user_id: "u-2".to_owned(),
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(1960, 1, 1).unwrap(),
            height_cm: 150.0,
            weight_kg: 45.0,
            goal: GoalKind::LoseWeight,
            activity_level: ActivityLevel::Sedentary,
        };

        assert!((daily_goals_for(&p, today).calories - MIN_CALORIES).abs() < f64::EPSILON);
    }
}
