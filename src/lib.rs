// ABOUTME: Main library entry point for the NutriSnap nutrition-tracking core
// ABOUTME: Food-image analysis pipeline, nutrition state, and persistence adapters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

#![deny(unsafe_code)]

//! # NutriSnap Core
//!
//! The engine of a nutrition-tracking client: photograph a meal, have a
//! vision-capable language model analyze it, and fold the validated result
//! into running macro totals and a recent-meals log.
//!
//! ## Architecture
//!
//! - **Analysis**: the vision client (request construction, transport,
//!   strict decode-then-validate response parsing) and the orchestrator
//!   state machine that owns one analysis lifecycle at a time
//! - **Nutrition**: the authoritative state store (totals, bounded meal
//!   log, goals-remaining arithmetic) and daily-goal derivation
//! - **Storage**: the on-device SQLite mirror and the best-effort remote
//!   row store, deliberately independent persistence paths
//! - **Context**: explicit dependency wiring with a session lifecycle
//!
//! ## Example
//!
//! ```rust,no_run
//! use nutrisnap::analysis::ImagePayload;
//! use nutrisnap::config::AppConfig;
//! use nutrisnap::context::AppContext;
//! use nutrisnap::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let ctx = AppContext::bootstrap(AppConfig::from_env()?).await?;
//!
//!     let image = ImagePayload::from_bytes(&std::fs::read("meal.jpg").map_err(
//!         |e| nutrisnap::errors::AppError::invalid_input(e.to_string()),
//!     )?)?;
//!
//!     let mut states = ctx.orchestrator.subscribe();
//!     ctx.orchestrator.start(image)?;
//!
//!     while states.changed().await.is_ok() {
//!         let snapshot = states.borrow().clone();
//!         println!("{:?} {}%", snapshot.phase, snapshot.progress);
//!     }
//!
//!     Ok(())
//! }
//! ```

/// Food-image analysis pipeline: client, orchestrator, prompts
pub mod analysis;

/// Environment-only configuration management
pub mod config;

/// Explicit dependency-injection context with a session lifecycle
pub mod context;

/// Unified error handling system with standard error codes
pub mod errors;

/// Logging configuration and structured logging setup
pub mod logging;

/// Common data structures for the nutrition-tracking domain
pub mod models;

/// Nutrition state: totals, recent meals, and goal derivation
pub mod nutrition;

/// Persistence adapters: on-device SQLite and the remote row store
pub mod storage;
