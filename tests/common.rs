// ABOUTME: Shared test utilities and fixtures for integration tests
// ABOUTME: In-memory stores, a scripted analyzer, and sample analysis results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `nutrisnap`
//!
//! Provides common fixtures to reduce duplication across integration tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use nutrisnap::analysis::{FoodAnalyzer, ImagePayload};
use nutrisnap::errors::{AppError, AppResult};
use nutrisnap::models::{
    DailyGoals, FoodAnalysisResult, MacroTotals, MealRecord, NutritionData, NutritionalInfo,
    Portion, RecentMeal, UserProfile,
};
use nutrisnap::nutrition::NutritionStore;
use nutrisnap::storage::{LocalStore, RemoteStore};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

// ============================================================================
// Fixtures
// ============================================================================

/// The reference analysis result used across scenario tests
pub fn grilled_chicken_salad() -> FoodAnalysisResult {
    FoodAnalysisResult {
        name: "Grilled Chicken Salad".to_owned(),
        ingredients: vec![
            "grilled chicken".to_owned(),
            "lettuce".to_owned(),
            "tomato".to_owned(),
        ],
        nutritional_info: NutritionalInfo {
            calories: 420.0,
            proteins: 38.0,
            carbs: 12.0,
            fats: 22.0,
            fiber: 4.0,
            sugar: 3.0,
        },
        portion: Portion {
            size: "large".to_owned(),
            weight: 300.0,
        },
        health_score: 8,
        recommendations: vec!["Add whole grains".to_owned()],
        allergies: vec![],
        confidence: 91.0,
    }
}

/// A second meal with different macros, for accumulation tests
pub fn porridge_bowl() -> FoodAnalysisResult {
    FoodAnalysisResult {
        name: "Porridge Bowl".to_owned(),
        ingredients: vec!["oats".to_owned(), "milk".to_owned(), "banana".to_owned()],
        nutritional_info: NutritionalInfo {
            calories: 310.0,
            proteins: 11.0,
            carbs: 52.0,
            fats: 7.0,
            fiber: 6.0,
            sugar: 14.0,
        },
        portion: Portion {
            size: "one bowl".to_owned(),
            weight: 350.0,
        },
        health_score: 7,
        recommendations: vec![],
        allergies: vec!["milk".to_owned()],
        confidence: 84.0,
    }
}

/// A meal with the given name and calories, other macros fixed
pub fn meal_named(name: &str, calories: f64) -> FoodAnalysisResult {
    let mut result = grilled_chicken_salad();
    result.name = name.to_owned();
    result.nutritional_info.calories = calories;
    result
}

/// A tiny valid image payload
pub fn test_image() -> ImagePayload {
    ImagePayload::from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap()
}

// ============================================================================
// In-Memory Stores
// ============================================================================

/// In-memory [`LocalStore`] with a failure toggle
#[derive(Default)]
pub struct MemoryLocalStore {
    states: Mutex<HashMap<String, (NutritionData, Vec<RecentMeal>)>>,
    fail_writes: AtomicBool,
}

impl MemoryLocalStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of persisted writes for a user (0 or 1; the mirror replaces)
    pub fn has_state(&self, user_id: &str) -> bool {
        self.states.lock().unwrap().contains_key(user_id)
    }

    /// Seed persisted state directly
    pub fn seed(&self, user_id: &str, data: NutritionData, meals: Vec<RecentMeal>) {
        self.states
            .lock()
            .unwrap()
            .insert(user_id.to_owned(), (data, meals));
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn save_state(
        &self,
        user_id: &str,
        data: &NutritionData,
        meals: &[RecentMeal],
    ) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        self.states
            .lock()
            .unwrap()
            .insert(user_id.to_owned(), (data.clone(), meals.to_vec()));
        Ok(())
    }

    async fn load_state(&self, user_id: &str) -> Result<Option<(NutritionData, Vec<RecentMeal>)>> {
        Ok(self.states.lock().unwrap().get(user_id).cloned())
    }
}

/// In-memory [`RemoteStore`] with a failure toggle
#[derive(Default)]
pub struct MemoryRemoteStore {
    records: Mutex<Vec<MealRecord>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    fail: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent call fail
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<MealRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn seed_profile(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn save_meal_record(&self, record: &MealRecord) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("remote unavailable");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn load_today_totals(&self, user_id: &str) -> Result<MacroTotals> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("remote unavailable");
        }
        let today = Utc::now().date_naive();
        let mut totals = MacroTotals::default();
        for record in self.records.lock().unwrap().iter() {
            if record.user_id == user_id && record.created_at.date_naive() == today {
                totals.add(&record.nutritional_info);
            }
        }
        Ok(totals)
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("remote unavailable");
        }
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }
}

// ============================================================================
// Scripted Analyzer
// ============================================================================

/// One scripted outcome for the fake analyzer
pub enum ScriptedOutcome {
    /// Resolve successfully after the delay
    Success(Duration, FoodAnalysisResult),
    /// Refuse after the delay, with the model's message
    Refused(Duration, String),
    /// Fail with a transport error after the delay
    Transport(Duration, u16),
    /// Fail schema validation after the delay
    Malformed(Duration, String),
}

/// [`FoodAnalyzer`] that replays a script instead of calling the network
///
/// Outcomes are consumed front to back; the script must hold one entry per
/// expected `analyze` call.
pub struct ScriptedAnalyzer {
    script: Mutex<VecDeque<ScriptedOutcome>>,
}

impl ScriptedAnalyzer {
    pub fn new(outcomes: Vec<ScriptedOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into_iter().collect()),
        })
    }

    /// A script with a single immediate success
    pub fn success(result: FoodAnalysisResult) -> Arc<Self> {
        Self::new(vec![ScriptedOutcome::Success(Duration::ZERO, result)])
    }
}

#[async_trait]
impl FoodAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, _image: &ImagePayload) -> AppResult<FoodAnalysisResult> {
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedAnalyzer ran out of outcomes");

        match outcome {
            ScriptedOutcome::Success(delay, result) => {
                tokio::time::sleep(delay).await;
                Ok(result)
            }
            ScriptedOutcome::Refused(delay, message) => {
                tokio::time::sleep(delay).await;
                Err(AppError::model_refused(message))
            }
            ScriptedOutcome::Transport(delay, status) => {
                tokio::time::sleep(delay).await;
                Err(AppError::transport(status, "connection reset"))
            }
            ScriptedOutcome::Malformed(delay, message) => {
                tokio::time::sleep(delay).await;
                Err(AppError::malformed_response(message))
            }
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

// ============================================================================
// Store Setup
// ============================================================================

/// A nutrition store over in-memory persistence, plus handles to both stores
pub fn create_memory_store(
    user_id: &str,
) -> (Arc<NutritionStore>, Arc<MemoryLocalStore>, Arc<MemoryRemoteStore>) {
    init_test_logging();

    let local = MemoryLocalStore::new();
    let remote = MemoryRemoteStore::new();

    let store = Arc::new(NutritionStore::new(
        user_id,
        Arc::clone(&local) as Arc<dyn LocalStore>,
        Some(Arc::clone(&remote) as Arc<dyn RemoteStore>),
        DailyGoals::default(),
    ));

    (store, local, remote)
}
