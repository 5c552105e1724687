// ABOUTME: REST adapter for the backend-as-a-service persistence tables
// ABOUTME: Row-level access to food_analyses and profiles, bearer-authenticated
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! Remote store
//!
//! Talks to the backend's row endpoints (`food_analyses`, `profiles`) over
//! HTTPS. Filtering uses the backend's column-operator query syntax
//! (`user_id=eq.<id>`, `created_at=gte.<ts>`). Every failure is an ordinary
//! `Err` — callers on the analysis path log and continue, because the
//! remote path is best-effort by design.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::RemoteStore;
use crate::models::{
    ActivityLevel, Gender, GoalKind, MacroTotals, MealRecord, NutritionalInfo, UserProfile,
};

/// Connection timeout toward the backend
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request timeout; row writes are small
const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Wire Types (snake_case table columns)
// ============================================================================

/// One `food_analyses` row, flattened the way the table stores it
#[derive(Debug, Serialize, Deserialize)]
struct MealRow {
    id: Uuid,
    user_id: String,
    name: String,
    ingredients: Vec<String>,
    calories: f64,
    proteins: f64,
    carbs: f64,
    fats: f64,
    fiber: f64,
    sugar: f64,
    portion_size: String,
    portion_weight: f64,
    health_score: i64,
    recommendations: Vec<String>,
    allergies: Vec<String>,
    confidence: f64,
    created_at: DateTime<Utc>,
}

impl From<&MealRecord> for MealRow {
    fn from(record: &MealRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id.clone(),
            name: record.name.clone(),
            ingredients: record.ingredients.clone(),
            calories: record.nutritional_info.calories,
            proteins: record.nutritional_info.proteins,
            carbs: record.nutritional_info.carbs,
            fats: record.nutritional_info.fats,
            fiber: record.nutritional_info.fiber,
            sugar: record.nutritional_info.sugar,
            portion_size: record.portion.size.clone(),
            portion_weight: record.portion.weight,
            health_score: record.health_score,
            recommendations: record.recommendations.clone(),
            allergies: record.allergies.clone(),
            confidence: record.confidence,
            created_at: record.created_at,
        }
    }
}

/// The nutrient columns of a row, as returned by a projected select
#[derive(Debug, Deserialize)]
struct MacroRow {
    calories: f64,
    proteins: f64,
    carbs: f64,
    fats: f64,
}

/// One `profiles` row
#[derive(Debug, Deserialize)]
struct ProfileRow {
    user_id: String,
    gender: Gender,
    birth_date: chrono::NaiveDate,
    height_cm: f64,
    weight_kg: f64,
    goal: GoalKind,
    activity_level: ActivityLevel,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            gender: row.gender,
            birth_date: row.birth_date,
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
            goal: row.goal,
            activity_level: row.activity_level,
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Configuration for the remote store adapter
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Service base URL
    pub base_url: String,
    /// Bearer credential for the authenticated identity
    pub api_key: String,
}

/// REST implementation of [`RemoteStore`]
pub struct RestStore {
    client: Client,
    config: RestStoreConfig,
}

impl RestStore {
    /// Create an adapter for the given backend
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: RestStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Build the URL for a table endpoint
    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{table}",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn save_meal_record(&self, record: &MealRecord) -> Result<()> {
        let row = MealRow::from(record);

        let response = self
            .client
            .post(self.table_url("food_analyses"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&row)
            .send()
            .await
            .context("Meal append request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Meal append rejected with HTTP {status}: {body}");
        }

        debug!(meal = %record.name, "Meal record appended remotely");
        Ok(())
    }

    async fn load_today_totals(&self, user_id: &str) -> Result<MacroTotals> {
        let day_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or_else(Utc::now, |t| t.and_utc());

        let user_filter = format!("eq.{user_id}");
        let created_filter = format!("gte.{}", day_start.to_rfc3339());

        let response = self
            .client
            .get(self.table_url("food_analyses"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .query(&[
                ("select", "calories,proteins,carbs,fats"),
                ("user_id", user_filter.as_str()),
                ("created_at", created_filter.as_str()),
            ])
            .send()
            .await
            .context("Today-totals request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Today-totals query rejected with HTTP {status}");
        }

        let rows: Vec<MacroRow> = response
            .json()
            .await
            .context("Today-totals response was not valid JSON")?;

        let mut totals = MacroTotals::default();
        for row in rows {
            totals.add(&NutritionalInfo {
                calories: row.calories,
                proteins: row.proteins,
                carbs: row.carbs,
                fats: row.fats,
                fiber: 0.0,
                sugar: 0.0,
            });
        }

        Ok(totals)
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let user_filter = format!("eq.{user_id}");

        let response = self
            .client
            .get(self.table_url("profiles"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .query(&[("user_id", user_filter.as_str())])
            .send()
            .await
            .context("Profile request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Profile query rejected with HTTP {status}");
        }

        let mut rows: Vec<ProfileRow> = response
            .json()
            .await
            .context("Profile response was not valid JSON")?;

        Ok(rows.pop().map(UserProfile::from))
    }
}
