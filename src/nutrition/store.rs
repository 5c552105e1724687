// ABOUTME: Authoritative nutrition state store: totals, recent meals, persistence hand-off
// ABOUTME: Mutated exclusively by apply_analysis; local write is load-bearing, remote is best-effort
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Nutrition State Store
//!
//! Holds the running macro totals and the bounded recent-meals log, and
//! mediates every mutation. The local store write must succeed before a
//! mutation commits; the remote append is an independent path that is
//! allowed to fail (and drift) without affecting the user-visible outcome.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::models::{
    DailyGoals, FoodAnalysisResult, MacroTotals, MealRecord, NutritionData, RecentMeal,
};
use crate::storage::{LocalStore, RemoteStore};

/// The recent-meals log keeps this many entries, newest first
const MAX_RECENT_MEALS: usize = 10;

#[derive(Debug, Clone)]
struct State {
    data: NutritionData,
    meals: Vec<RecentMeal>,
}

/// The per-session nutrition state store
///
/// Single-writer by construction: only the analysis orchestrator calls
/// [`NutritionStore::apply_analysis`], so the `RwLock` exists to let the
/// presentation layer take concurrent read snapshots, not to arbitrate
/// writers.
pub struct NutritionStore {
    user_id: String,
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    state: RwLock<State>,
}

impl NutritionStore {
    /// Create a store with zeroed totals and the given daily goals
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        daily_goals: DailyGoals,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            local,
            remote,
            state: RwLock::new(State {
                data: NutritionData {
                    consumed: MacroTotals::default(),
                    daily_goals,
                },
                meals: Vec::new(),
            }),
        }
    }

    /// Restore persisted state
    ///
    /// Totals and meals come from the local mirror when present; otherwise,
    /// when a remote store is configured, today's totals are rebuilt from
    /// the remote aggregate. Daily goals always keep their constructed
    /// (profile-derived) values — they are session input, not restored
    /// state.
    ///
    /// # Errors
    ///
    /// Returns `StorageLocal` if the local mirror cannot be read. A remote
    /// failure is tolerated and logged.
    pub async fn hydrate(&self) -> AppResult<()> {
        let restored = self
            .local
            .load_state(&self.user_id)
            .await
            .map_err(|e| AppError::storage_local(e.to_string()))?;

        if let Some((data, meals)) = restored {
            let mut state = self.state.write().await;
            state.data.consumed = data.consumed;
            state.meals = meals;
            debug!(meals = state.meals.len(), "Restored nutrition state from local store");
            return Ok(());
        }

        if let Some(remote) = &self.remote {
            match remote.load_today_totals(&self.user_id).await {
                Ok(totals) => {
                    let mut state = self.state.write().await;
                    state.data.consumed = totals;
                    debug!("Rebuilt today's totals from remote store");
                }
                Err(error) => {
                    warn!("Could not load today's totals from remote store: {error}");
                }
            }
        }

        Ok(())
    }

    /// Fold one accepted analysis into the aggregate
    ///
    /// Adds calories/proteins/carbs/fats to the running totals (fiber and
    /// sugar stay per-meal only), prepends a freshly identified meal
    /// snapshot, truncates the log to the most recent
    /// 10 entries, and persists to the local store **before** committing the
    /// in-memory change. The remote append runs afterwards and never fails
    /// the operation.
    ///
    /// # Errors
    ///
    /// Returns `StorageLocal` if the local write fails; in that case the
    /// in-memory state is unchanged.
    pub async fn apply_analysis(&self, result: &FoodAnalysisResult) -> AppResult<()> {
        let record = MealRecord::from_result(&self.user_id, result);

        {
            let mut state = self.state.write().await;

            let mut next = state.clone();
            next.data.consumed.add(&result.nutritional_info);
            next.meals.insert(0, RecentMeal::from_result(result));
            next.meals.truncate(MAX_RECENT_MEALS);

            self.local
                .save_state(&self.user_id, &next.data, &next.meals)
                .await
                .map_err(|e| AppError::storage_local(e.to_string()))?;

            *state = next;
        }

        // Independent persistence path: the meal was genuinely analyzed, so
        // a remote failure is logged but never rolls back the local state
        // nor resurfaces as an analysis failure.
        if let Some(remote) = &self.remote {
            if let Err(error) = remote.save_meal_record(&record).await {
                warn!(
                    meal = %record.name,
                    "Remote meal append failed; local and remote stores may drift: {error}"
                );
            }
        }

        Ok(())
    }

    /// Replace the daily goals (e.g., after a profile update) and persist
    ///
    /// # Errors
    ///
    /// Returns `StorageLocal` if the local write fails.
    pub async fn update_goals(&self, daily_goals: DailyGoals) -> AppResult<()> {
        let mut state = self.state.write().await;

        let mut next = state.clone();
        next.data.daily_goals = daily_goals;

        self.local
            .save_state(&self.user_id, &next.data, &next.meals)
            .await
            .map_err(|e| AppError::storage_local(e.to_string()))?;

        *state = next;
        Ok(())
    }

    /// What is left of each macro goal today: `max(0, goal - consumed)`
    ///
    /// Total function — never negative, never errs.
    pub async fn goals_remaining(&self) -> MacroTotals {
        let state = self.state.read().await;
        let consumed = &state.data.consumed;
        let goals = &state.data.daily_goals;

        MacroTotals {
            calories: (goals.calories - consumed.calories).max(0.0),
            proteins: (goals.proteins - consumed.proteins).max(0.0),
            carbs: (goals.carbs - consumed.carbs).max(0.0),
            fats: (goals.fats - consumed.fats).max(0.0),
        }
    }

    /// Snapshot of the nutrition aggregate
    pub async fn nutrition_data(&self) -> NutritionData {
        self.state.read().await.data.clone()
    }

    /// Snapshot of the recent-meals log, newest first
    pub async fn recent_meals(&self) -> Vec<RecentMeal> {
        self.state.read().await.meals.clone()
    }

    /// The identity this store persists under
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
