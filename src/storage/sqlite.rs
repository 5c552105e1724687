// ABOUTME: SQLite persistence for nutrition state, meal records, and profiles
// ABOUTME: Implements both store traits so the device can run fully offline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! SQLite store
//!
//! The on-device database. Implements [`LocalStore`] for the nutrition
//! state mirror and [`RemoteStore`] for the relational `food_analyses` /
//! `profiles` tables, which lets a device without a configured backend run
//! the whole pipeline against local storage only. Schema is migrated
//! in-process at startup.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row as _;
use std::str::FromStr as _;
use tracing::debug;

use super::{LocalStore, RemoteStore};
use crate::models::{DailyGoals, MacroTotals, MealRecord, NutritionData, RecentMeal, UserProfile};

/// Schema statements run by [`SqliteStore::migrate`]
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS nutrition_state (
        user_id TEXT PRIMARY KEY,
        consumed_calories REAL NOT NULL,
        consumed_proteins REAL NOT NULL,
        consumed_carbs REAL NOT NULL,
        consumed_fats REAL NOT NULL,
        goal_calories REAL NOT NULL,
        goal_proteins REAL NOT NULL,
        goal_carbs REAL NOT NULL,
        goal_fats REAL NOT NULL,
        recent_meals TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS food_analyses (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        ingredients TEXT NOT NULL,
        calories REAL NOT NULL,
        proteins REAL NOT NULL,
        carbs REAL NOT NULL,
        fats REAL NOT NULL,
        fiber REAL NOT NULL,
        sugar REAL NOT NULL,
        portion_size TEXT NOT NULL,
        portion_weight REAL NOT NULL,
        health_score INTEGER NOT NULL,
        recommendations TEXT NOT NULL,
        allergies TEXT NOT NULL,
        confidence REAL NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_food_analyses_user_created
        ON food_analyses(user_id, created_at)",
    "CREATE TABLE IF NOT EXISTS profiles (
        user_id TEXT PRIMARY KEY,
        gender TEXT NOT NULL,
        birth_date TEXT NOT NULL,
        height_cm REAL NOT NULL,
        weight_kg REAL NOT NULL,
        goal TEXT NOT NULL,
        activity_level TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
];

/// SQLite database implementation
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if necessary) the database at the given URL
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the database cannot be
    /// opened.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        // An in-memory database exists per connection; a single connection
        // keeps it coherent across the pool.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        Ok(Self { pool })
    }

    /// Run schema migration
    ///
    /// # Errors
    ///
    /// Returns an error if any schema statement fails.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("SQLite schema migrated");
        Ok(())
    }

    /// Open and migrate in one step
    ///
    /// # Errors
    ///
    /// Returns an error if opening or migration fails.
    pub async fn open(database_url: &str) -> Result<Self> {
        let store = Self::new(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// The underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a user profile row
    ///
    /// Profiles are produced by onboarding, outside this crate; this method
    /// exists for seeding and synchronization.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO profiles
                (user_id, gender, birth_date, height_cm, weight_kg, goal, activity_level, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                gender = excluded.gender,
                birth_date = excluded.birth_date,
                height_cm = excluded.height_cm,
                weight_kg = excluded.weight_kg,
                goal = excluded.goal,
                activity_level = excluded.activity_level,
                updated_at = excluded.updated_at",
        )
        .bind(&profile.user_id)
        .bind(enum_token(&profile.gender)?)
        .bind(profile.birth_date.to_string())
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(enum_token(&profile.goal)?)
        .bind(enum_token(&profile.activity_level)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn save_state(
        &self,
        user_id: &str,
        data: &NutritionData,
        meals: &[RecentMeal],
    ) -> Result<()> {
        let meals_json = serde_json::to_string(meals)?;

        sqlx::query(
            "INSERT INTO nutrition_state
                (user_id, consumed_calories, consumed_proteins, consumed_carbs, consumed_fats,
                 goal_calories, goal_proteins, goal_carbs, goal_fats, recent_meals, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                consumed_calories = excluded.consumed_calories,
                consumed_proteins = excluded.consumed_proteins,
                consumed_carbs = excluded.consumed_carbs,
                consumed_fats = excluded.consumed_fats,
                goal_calories = excluded.goal_calories,
                goal_proteins = excluded.goal_proteins,
                goal_carbs = excluded.goal_carbs,
                goal_fats = excluded.goal_fats,
                recent_meals = excluded.recent_meals,
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(data.consumed.calories)
        .bind(data.consumed.proteins)
        .bind(data.consumed.carbs)
        .bind(data.consumed.fats)
        .bind(data.daily_goals.calories)
        .bind(data.daily_goals.proteins)
        .bind(data.daily_goals.carbs)
        .bind(data.daily_goals.fats)
        .bind(meals_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_state(&self, user_id: &str) -> Result<Option<(NutritionData, Vec<RecentMeal>)>> {
        let row = sqlx::query("SELECT * FROM nutrition_state WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let meals_json: String = row.try_get("recent_meals")?;
        let meals: Vec<RecentMeal> = serde_json::from_str(&meals_json)
            .context("Corrupt recent_meals payload in nutrition_state")?;

        let data = NutritionData {
            consumed: MacroTotals {
                calories: row.try_get("consumed_calories")?,
                proteins: row.try_get("consumed_proteins")?,
                carbs: row.try_get("consumed_carbs")?,
                fats: row.try_get("consumed_fats")?,
            },
            daily_goals: DailyGoals {
                calories: row.try_get("goal_calories")?,
                proteins: row.try_get("goal_proteins")?,
                carbs: row.try_get("goal_carbs")?,
                fats: row.try_get("goal_fats")?,
            },
        };

        Ok(Some((data, meals)))
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn save_meal_record(&self, record: &MealRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO food_analyses
                (id, user_id, name, ingredients, calories, proteins, carbs, fats, fiber, sugar,
                 portion_size, portion_weight, health_score, recommendations, allergies,
                 confidence, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.user_id)
        .bind(&record.name)
        .bind(serde_json::to_string(&record.ingredients)?)
        .bind(record.nutritional_info.calories)
        .bind(record.nutritional_info.proteins)
        .bind(record.nutritional_info.carbs)
        .bind(record.nutritional_info.fats)
        .bind(record.nutritional_info.fiber)
        .bind(record.nutritional_info.sugar)
        .bind(&record.portion.size)
        .bind(record.portion.weight)
        .bind(record.health_score)
        .bind(serde_json::to_string(&record.recommendations)?)
        .bind(serde_json::to_string(&record.allergies)?)
        .bind(record.confidence)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_today_totals(&self, user_id: &str) -> Result<MacroTotals> {
        let day_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or_else(Utc::now, |t| t.and_utc());

        let row = sqlx::query(
            "SELECT
                COALESCE(SUM(calories), 0.0) AS calories,
                COALESCE(SUM(proteins), 0.0) AS proteins,
                COALESCE(SUM(carbs), 0.0) AS carbs,
                COALESCE(SUM(fats), 0.0) AS fats
             FROM food_analyses
             WHERE user_id = ? AND created_at >= ?",
        )
        .bind(user_id)
        .bind(day_start.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(MacroTotals {
            calories: row.try_get("calories")?,
            proteins: row.try_get("proteins")?,
            carbs: row.try_get("carbs")?,
            fats: row.try_get("fats")?,
        })
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let birth_date: String = row.try_get("birth_date")?;

        Ok(Some(UserProfile {
            user_id: row.try_get("user_id")?,
            gender: parse_enum_token(&row.try_get::<String, _>("gender")?)?,
            birth_date: birth_date
                .parse()
                .context("Corrupt birth_date in profiles")?,
            height_cm: row.try_get("height_cm")?,
            weight_kg: row.try_get("weight_kg")?,
            goal: parse_enum_token(&row.try_get::<String, _>("goal")?)?,
            activity_level: parse_enum_token(&row.try_get::<String, _>("activity_level")?)?,
        }))
    }
}

/// Serialize a fieldless serde enum to its string token ("male", "lose_weight", ...)
fn enum_token<T: serde::Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(token) => Ok(token),
        other => Err(anyhow!("Expected string token, got {other}")),
    }
}

/// Parse a fieldless serde enum from its string token
fn parse_enum_token<T: serde::de::DeserializeOwned>(token: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(token.to_owned()))
        .map_err(|e| anyhow!("Unknown enum token {token:?}: {e}"))
}
