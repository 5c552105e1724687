// ABOUTME: Application context: explicit dependency wiring for the analysis pipeline
// ABOUTME: Constructed at session start, torn down at session end; no ambient singletons
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Application Context
//!
//! One explicit container wires the pipeline together: configuration in,
//! analyzer + stores + orchestrator out, all behind `Arc`s with a defined
//! lifecycle. Components receive their collaborators through this context
//! instead of reaching for module-level state.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis::{
    AnalysisOrchestrator, FoodAnalyzer, OrchestratorConfig, VisionAnalysisClient,
};
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{DailyGoals, UserProfile};
use crate::nutrition::{daily_goals_for, NutritionStore};
use crate::storage::{LocalStore, RemoteStore, RestStore, RestStoreConfig, SqliteStore};

/// The session-scoped dependency container
pub struct AppContext {
    /// Loaded configuration
    pub config: AppConfig,
    /// The analysis client
    pub analyzer: Arc<dyn FoodAnalyzer>,
    /// The nutrition state store
    pub store: Arc<NutritionStore>,
    /// The analysis lifecycle state machine
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// The on-device database
    pub local: Arc<SqliteStore>,
}

impl AppContext {
    /// Build and hydrate the full pipeline from configuration
    ///
    /// Opens (and migrates) the local database, wires the optional remote
    /// store, derives daily goals from the user profile when one can be
    /// loaded, restores persisted nutrition state, and constructs the
    /// orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the local database or the analysis client cannot
    /// be initialized. A missing or unreachable remote store is tolerated.
    pub async fn bootstrap(config: AppConfig) -> AppResult<Self> {
        let local = Arc::new(
            SqliteStore::open(&config.storage.database_url)
                .await
                .map_err(|e| AppError::storage_local(e.to_string()))?,
        );

        let remote: Option<Arc<dyn RemoteStore>> = match (
            &config.storage.remote_base_url,
            &config.storage.remote_api_key,
        ) {
            (Some(base_url), Some(api_key)) => {
                let rest = RestStore::new(RestStoreConfig {
                    base_url: base_url.clone(),
                    api_key: api_key.clone(),
                })
                .map_err(|e| AppError::storage_remote(e.to_string()))?;
                Some(Arc::new(rest))
            }
            (Some(_), None) => {
                warn!("Remote base URL configured without an API key; remote path disabled");
                None
            }
            _ => None,
        };

        let user_id = config.storage.user_id.clone();
        let goals = resolve_daily_goals(&user_id, remote.as_deref(), &local).await;

        let store = Arc::new(NutritionStore::new(
            user_id,
            Arc::clone(&local) as Arc<dyn LocalStore>,
            remote,
            goals,
        ));
        store.hydrate().await?;

        let analyzer: Arc<dyn FoodAnalyzer> =
            Arc::new(VisionAnalysisClient::from_config(&config.vision)?);

        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            Arc::clone(&analyzer),
            Arc::clone(&store),
            OrchestratorConfig {
                timeout: Duration::from_secs(config.analysis.timeout_secs),
            },
        ));

        info!(user = %store.user_id(), "Application context ready");

        Ok(Self {
            config,
            analyzer,
            store,
            orchestrator,
            local,
        })
    }

    /// Tear the session down: stop the orchestrator's background tasks
    ///
    /// In-flight analysis resolutions after this point are ignored.
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }
}

/// Derive daily goals from the best available profile source
///
/// Preference order: remote profile, local profile row, built-in defaults.
async fn resolve_daily_goals(
    user_id: &str,
    remote: Option<&dyn RemoteStore>,
    local: &SqliteStore,
) -> DailyGoals {
    let today = Utc::now().date_naive();

    if let Some(remote) = remote {
        match remote.load_profile(user_id).await {
            Ok(Some(profile)) => return goals_from_profile(&profile, today),
            Ok(None) => {}
            Err(error) => warn!("Could not load remote profile: {error}"),
        }
    }

    match RemoteStore::load_profile(local, user_id).await {
        Ok(Some(profile)) => goals_from_profile(&profile, today),
        Ok(None) => DailyGoals::default(),
        Err(error) => {
            warn!("Could not load local profile: {error}");
            DailyGoals::default()
        }
    }
}

fn goals_from_profile(profile: &UserProfile, today: chrono::NaiveDate) -> DailyGoals {
    let goals = daily_goals_for(profile, today);
    info!(
        calories = goals.calories,
        "Daily goals derived from user profile"
    );
    goals
}
