// ABOUTME: Persistence abstraction for nutrition state and meal records
// ABOUTME: Local device mirror and remote service behind separate async traits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Persistence Adapters
//!
//! Two independent persistence paths, deliberately not joined by any
//! transaction:
//!
//! - [`LocalStore`]: the on-device mirror of nutrition totals and the
//!   recent-meals log. Authoritative for immediate UI feedback; a failure
//!   here fails the surrounding operation.
//! - [`RemoteStore`]: the backend-as-a-service rows (`food_analyses`,
//!   `profiles`). Best-effort; the core tolerates it being unconfigured,
//!   unauthenticated, or unreachable, and the two stores are allowed to
//!   drift.

pub mod remote;
pub mod sqlite;

pub use remote::{RestStore, RestStoreConfig};
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{MacroTotals, MealRecord, NutritionData, RecentMeal, UserProfile};

/// On-device mirror of the nutrition aggregate
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Durably replace the persisted totals and recent-meals log for a user
    async fn save_state(
        &self,
        user_id: &str,
        data: &NutritionData,
        meals: &[RecentMeal],
    ) -> Result<()>;

    /// Load the persisted totals and recent-meals log, if any
    async fn load_state(&self, user_id: &str) -> Result<Option<(NutritionData, Vec<RecentMeal>)>>;
}

/// Remote relational store exposed by the backend-as-a-service
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Durable append of one analyzed meal for the owning identity
    ///
    /// Idempotency is not guaranteed by the caller; adapters that retry
    /// must handle duplicates themselves.
    async fn save_meal_record(&self, record: &MealRecord) -> Result<()>;

    /// Aggregate of all meals recorded today (the store's clock, UTC),
    /// summed across the identity's records
    async fn load_today_totals(&self, user_id: &str) -> Result<MacroTotals>;

    /// The onboarding-derived profile, if one exists
    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}
