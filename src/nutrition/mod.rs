// ABOUTME: Nutrition state: running totals, recent meals, and goal derivation
// ABOUTME: Single-writer store mutated only by accepted analyses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Nutrition State
//!
//! The authoritative aggregate of what the user has eaten: running macro
//! totals, the bounded recent-meals log, and the daily goals they are
//! measured against. All mutation funnels through
//! [`NutritionStore::apply_analysis`]; the presentation layer reads
//! snapshots only.

pub mod goals;
pub mod store;

pub use goals::daily_goals_for;
pub use store::NutritionStore;
