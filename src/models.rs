// ABOUTME: Core data structures for the NutriSnap nutrition-tracking domain
// ABOUTME: Analysis results, nutrition aggregates, meal records, and user profiles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Domain Models
//!
//! Common data structures shared across the analysis pipeline, the nutrition
//! state store, and the persistence adapters. Field names serialize to the
//! camelCase wire contract used by the analysis endpoint and the remote
//! store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Analysis Output
// ============================================================================

/// Per-meal nutrient record
///
/// All six fields are required and non-negative once a result has passed
/// validation. Fiber and sugar exist only on the per-meal record; they are
/// never accumulated into the running aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionalInfo {
    /// Kilocalories
    pub calories: f64,
    /// Protein, grams
    pub proteins: f64,
    /// Carbohydrates, grams
    pub carbs: f64,
    /// Fat, grams
    pub fats: f64,
    /// Fiber, grams
    pub fiber: f64,
    /// Sugar, grams
    pub sugar: f64,
}

/// Estimated portion for an analyzed meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portion {
    /// Free-text descriptor ("large", "one bowl", ...)
    pub size: String,
    /// Estimated weight in grams
    pub weight: f64,
}

/// The canonical output of one food-image analysis
///
/// Constructed only by the analysis client after strict validation of the
/// model response; no partially valid instance ever exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysisResult {
    /// Identified dish name
    pub name: String,
    /// Ingredients in display order; no dedup guarantee
    pub ingredients: Vec<String>,
    /// Nutrient record for the analyzed portion
    pub nutritional_info: NutritionalInfo,
    /// Estimated portion
    pub portion: Portion,
    /// Health score in [1, 10]
    pub health_score: i64,
    /// Free-text recommendations, 0-3 typical, display order preserved
    pub recommendations: Vec<String>,
    /// Allergen labels; set semantics, duplicates tolerated from the source
    pub allergies: Vec<String>,
    /// Model's self-reported certainty in [0, 100]
    pub confidence: f64,
}

// ============================================================================
// Nutrition Aggregate
// ============================================================================

/// A calories/proteins/carbs/fats quad
///
/// Used both for running totals and for goals-remaining arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    /// Kilocalories
    pub calories: f64,
    /// Protein, grams
    pub proteins: f64,
    /// Carbohydrates, grams
    pub carbs: f64,
    /// Fat, grams
    pub fats: f64,
}

impl MacroTotals {
    /// Add one meal's nutrients to the totals (fiber/sugar excluded)
    pub fn add(&mut self, info: &NutritionalInfo) {
        self.calories += info.calories;
        self.proteins += info.proteins;
        self.carbs += info.carbs;
        self.fats += info.fats;
    }
}

/// Externally supplied daily macro targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoals {
    /// Kilocalorie target
    pub calories: f64,
    /// Protein target, grams
    pub proteins: f64,
    /// Carbohydrate target, grams
    pub carbs: f64,
    /// Fat target, grams
    pub fats: f64,
}

impl Default for DailyGoals {
    /// Baseline targets used until a profile-derived goal is available
    fn default() -> Self {
        Self {
            calories: 2000.0,
            proteins: 100.0,
            carbs: 250.0,
            fats: 70.0,
        }
    }
}

/// The per-user nutrition aggregate: running totals plus daily goals
///
/// Created zeroed; mutated exclusively through the nutrition store's
/// `apply_analysis`; persisted after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionData {
    /// Running totals, monotonically increased by each accepted analysis
    pub consumed: MacroTotals,
    /// Daily targets
    pub daily_goals: DailyGoals,
}

/// A denormalized log entry for one analyzed meal
///
/// The nutrient snapshot is embedded by value; later edits to the source
/// result never reach a stored meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMeal {
    /// Unique identifier, sortable by creation
    pub id: Uuid,
    /// Dish name
    pub name: String,
    /// Nutrient snapshot at insertion time
    pub nutritional_info: NutritionalInfo,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
}

impl RecentMeal {
    /// Build a meal entry from an analysis result with a fresh identity
    #[must_use]
    pub fn from_result(result: &FoodAnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: result.name.clone(),
            nutritional_info: result.nutritional_info,
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Persistence Rows
// ============================================================================

/// One durable row of the `food_analyses` table: a flattened analysis result
/// associated with the identity that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    /// Generated row identity
    pub id: Uuid,
    /// Owning user
    pub user_id: String,
    /// Dish name
    pub name: String,
    /// Ingredients in display order
    pub ingredients: Vec<String>,
    /// Nutrient snapshot
    pub nutritional_info: NutritionalInfo,
    /// Estimated portion
    pub portion: Portion,
    /// Health score in [1, 10]
    pub health_score: i64,
    /// Recommendations
    pub recommendations: Vec<String>,
    /// Allergen labels
    pub allergies: Vec<String>,
    /// Model confidence in [0, 100]
    pub confidence: f64,
    /// Row creation timestamp
    pub created_at: DateTime<Utc>,
}

impl MealRecord {
    /// Build a persistence row from an analysis result
    #[must_use]
    pub fn from_result(user_id: &str, result: &FoodAnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_owned(),
            name: result.name.clone(),
            ingredients: result.ingredients.clone(),
            nutritional_info: result.nutritional_info,
            portion: result.portion.clone(),
            health_score: result.health_score,
            recommendations: result.recommendations.clone(),
            allergies: result.allergies.clone(),
            confidence: result.confidence,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// User Profile (consumed, not produced)
// ============================================================================

/// Biological sex recorded during onboarding, used for BMR derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male
    Male,
    /// Female
    Female,
}

/// Weight goal selected during onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Caloric deficit
    LoseWeight,
    /// Maintenance
    Maintain,
    /// Caloric surplus
    GainWeight,
}

/// Self-reported activity level, scales the BMR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// 1-3 sessions per week
    Light,
    /// 3-5 sessions per week
    Moderate,
    /// 6-7 sessions per week
    Active,
    /// Physical job or twice-daily training
    VeryActive,
}

impl ActivityLevel {
    /// Standard activity multiplier applied to the BMR
    #[must_use]
    pub const fn factor(&self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

/// Onboarding-derived user attributes, read from the `profiles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Owning user
    pub user_id: String,
    /// Biological sex
    pub gender: Gender,
    /// Date of birth
    pub birth_date: chrono::NaiveDate,
    /// Height in centimeters
    pub height_cm: f64,
    /// Weight in kilograms
    pub weight_kg: f64,
    /// Selected weight goal
    pub goal: GoalKind,
    /// Self-reported activity level
    pub activity_level: ActivityLevel,
}

impl UserProfile {
    /// Age in whole years at the given date
    ///
    /// A birth date in the future yields 0 rather than an error.
    #[must_use]
    pub fn age_years(&self, today: chrono::NaiveDate) -> u32 {
        today.years_since(self.birth_date).unwrap_or(0)
    }
}
