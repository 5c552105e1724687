// ABOUTME: Analysis lifecycle state machine with simulated progress and auto-reset
// ABOUTME: Owns one analysis at a time; hands results to the nutrition store before reporting success
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Analysis Orchestrator
//!
//! Owns the asynchronous lifecycle of one food-image analysis:
//! `Idle → InProgress → Succeeded | Failed → Idle`.
//!
//! While a request is in flight a ticker advances a **simulated** progress
//! value on a fixed cadence, capped below completion — the number is
//! cosmetic, not a measurement of the network call. Progress is forced to
//! 100 only when the real call resolves successfully.
//!
//! Ordering guarantee: the nutrition store's `apply_analysis` (including
//! local persistence) completes before `Succeeded` is observable, so any
//! reader that sees the success state also sees the updated totals.
//!
//! Concurrency: at most one analysis per orchestrator instance. A `start`
//! while one is in flight is rejected with `AnalysisBusy`. After shutdown,
//! a late resolution of the in-flight call is a no-op.

use rand::Rng as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{FoodAnalyzer, ImagePayload};
use crate::errors::{AppError, AppResult};
use crate::models::FoodAnalysisResult;
use crate::nutrition::NutritionStore;

// ============================================================================
// Tuning Constants
// ============================================================================

/// Cadence of the simulated-progress ticker
const PROGRESS_TICK_MS: u64 = 300;

/// Largest single progress step
const PROGRESS_MAX_STEP: u8 = 5;

/// Simulated progress never claims more than this before the call resolves
const PROGRESS_CEILING: u8 = 90;

/// How long a success state stays visible before auto-reverting to idle
const SUCCESS_GRACE_MS: u64 = 2000;

// ============================================================================
// Observable State
// ============================================================================

/// Lifecycle phase of the current (or last) analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    /// No analysis active
    Idle,
    /// A request is in flight
    InProgress,
    /// The last analysis completed; transient, auto-reverts to idle
    Succeeded,
    /// The last analysis failed; sticky until dismissed or superseded
    Failed,
}

/// One observable snapshot of the orchestrator state
///
/// Published through a watch channel; the presentation layer reads it,
/// never writes it.
#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    /// Current phase
    pub phase: AnalysisPhase,
    /// Progress in [0, 100]; simulated while in flight, 100 on success
    pub progress: u8,
    /// Human-readable failure message, present only in `Failed`
    pub error: Option<String>,
    /// The last successful result, cleared when the grace period expires
    pub last_result: Option<FoodAnalysisResult>,
}

impl AnalysisSnapshot {
    fn idle() -> Self {
        Self {
            phase: AnalysisPhase::Idle,
            progress: 0,
            error: None,
            last_result: None,
        }
    }
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Overall deadline for one analysis
    pub timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Task handles and in-flight bookkeeping
///
/// `epoch` increments on every `start` and on shutdown; spawned tasks carry
/// the epoch they were started under and no-op when it no longer matches,
/// which is what makes late resolutions harmless.
struct Inner {
    busy: bool,
    disposed: bool,
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
    reset: Option<JoinHandle<()>>,
    in_flight: Option<JoinHandle<()>>,
}

impl Inner {
    fn abort_tasks(&mut self) {
        for handle in [
            self.ticker.take(),
            self.reset.take(),
            self.in_flight.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

/// The analysis lifecycle state machine
///
/// Constructed once per session from the application context; observers
/// subscribe to state snapshots through [`AnalysisOrchestrator::subscribe`].
pub struct AnalysisOrchestrator {
    analyzer: Arc<dyn FoodAnalyzer>,
    store: Arc<NutritionStore>,
    config: OrchestratorConfig,
    state: Arc<watch::Sender<AnalysisSnapshot>>,
    inner: Arc<Mutex<Inner>>,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator over the given analyzer and nutrition store
    #[must_use]
    pub fn new(
        analyzer: Arc<dyn FoodAnalyzer>,
        store: Arc<NutritionStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(AnalysisSnapshot::idle());

        Self {
            analyzer,
            store,
            config,
            state: Arc::new(tx),
            inner: Arc::new(Mutex::new(Inner {
                busy: false,
                disposed: false,
                epoch: 0,
                ticker: None,
                reset: None,
                in_flight: None,
            })),
        }
    }

    /// Subscribe to state snapshots
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.state.subscribe()
    }

    /// The current state snapshot
    #[must_use]
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.state.borrow().clone()
    }

    /// Start analyzing one image
    ///
    /// Returns as soon as the analysis is accepted; completion is observed
    /// through the watch channel. Starting clears any prior error or result.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisBusy` if an analysis is already in flight, and
    /// `Internal` if the orchestrator has been shut down.
    pub fn start(&self, image: ImagePayload) -> AppResult<()> {
        let epoch = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|_| AppError::internal("Orchestrator state poisoned"))?;

            if inner.disposed {
                return Err(AppError::internal("Orchestrator has been shut down"));
            }
            if inner.busy {
                return Err(AppError::busy());
            }

            inner.busy = true;
            inner.epoch += 1;
            // A pending grace-period reset belongs to the previous episode.
            inner.abort_tasks();
            inner.epoch
        };

        info!(epoch, "Starting food-image analysis");

        self.state.send_replace(AnalysisSnapshot {
            phase: AnalysisPhase::InProgress,
            progress: 0,
            error: None,
            last_result: None,
        });

        let ticker = self.spawn_ticker();
        let in_flight = self.spawn_analysis(image, epoch);

        if let Ok(mut inner) = self.inner.lock() {
            // A shutdown can race the spawns above; don't leak the tasks.
            if inner.disposed || inner.epoch != epoch {
                ticker.abort();
                in_flight.abort();
            } else {
                inner.ticker = Some(ticker);
                inner.in_flight = Some(in_flight);
            }
        }

        Ok(())
    }

    /// Clear a sticky failure state back to idle
    ///
    /// No-op unless the orchestrator is currently in `Failed`.
    pub fn dismiss_error(&self) {
        self.state.send_modify(|snapshot| {
            if snapshot.phase == AnalysisPhase::Failed {
                *snapshot = AnalysisSnapshot::idle();
            }
        });
    }

    /// Tear the orchestrator down: abort the ticker and any in-flight work
    ///
    /// A late resolution of the network call after shutdown is ignored.
    pub fn shutdown(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.disposed = true;
            inner.epoch += 1;
            inner.busy = false;
            inner.abort_tasks();
        }
        debug!("Analysis orchestrator shut down");
    }

    /// Advance the simulated progress on a fixed cadence, capped below 100
    fn spawn_ticker(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(PROGRESS_TICK_MS));
            // The first tick fires immediately; skip it so progress starts at 0.
            interval.tick().await;

            loop {
                interval.tick().await;
                state.send_if_modified(|snapshot| {
                    if snapshot.phase != AnalysisPhase::InProgress {
                        return false;
                    }
                    let step = rand::thread_rng().gen_range(1..=PROGRESS_MAX_STEP);
                    let next = snapshot.progress.saturating_add(step).min(PROGRESS_CEILING);
                    if next == snapshot.progress {
                        return false;
                    }
                    snapshot.progress = next;
                    true
                });
            }
        })
    }

    /// Run the analysis call and fold its outcome into the state machine
    fn spawn_analysis(&self, image: ImagePayload, epoch: u64) -> JoinHandle<()> {
        let analyzer = Arc::clone(&self.analyzer);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let inner = Arc::clone(&self.inner);
        let timeout = self.config.timeout;

        tokio::spawn(async move {
            let outcome = tokio::time::timeout(timeout, analyzer.analyze(&image)).await;

            // The orchestrator may have been shut down while we were waiting;
            // in that case this resolution must not touch state at all.
            let stale = inner
                .lock()
                .map_or(true, |guard| guard.disposed || guard.epoch != epoch);
            if stale {
                debug!(epoch, "Dropping stale analysis resolution");
                return;
            }

            let final_snapshot = match outcome {
                Ok(Ok(result)) => Self::complete_success(&store, result).await,
                Ok(Err(error)) => {
                    warn!(code = ?error.code, "Analysis failed: {}", error.user_message());
                    Self::failed(error.user_message().to_owned())
                }
                Err(_elapsed) => {
                    let error = AppError::timeout(timeout.as_secs());
                    warn!("Analysis timed out after {:?}", timeout);
                    Self::failed(error.user_message().to_owned())
                }
            };

            let succeeded = final_snapshot.phase == AnalysisPhase::Succeeded;

            // Re-check staleness: shutdown may have happened during the
            // store hand-off above.
            if let Ok(mut guard) = inner.lock() {
                if guard.disposed || guard.epoch != epoch {
                    return;
                }
                if let Some(ticker) = guard.ticker.take() {
                    ticker.abort();
                }
                guard.busy = false;
                state.send_replace(final_snapshot);

                if succeeded {
                    guard.reset = Some(Self::spawn_grace_reset(&state, &inner, epoch));
                }
            }
        })
    }

    /// Apply a successful result to the nutrition store, then build the
    /// success snapshot — in that order, so observers of `Succeeded` always
    /// see the updated totals
    async fn complete_success(
        store: &Arc<NutritionStore>,
        result: FoodAnalysisResult,
    ) -> AnalysisSnapshot {
        match store.apply_analysis(&result).await {
            Ok(()) => {
                info!(dish = %result.name, "Analysis succeeded");
                AnalysisSnapshot {
                    phase: AnalysisPhase::Succeeded,
                    progress: 100,
                    error: None,
                    last_result: Some(result),
                }
            }
            Err(error) => {
                warn!("Failed to record analysis result: {error}");
                Self::failed(error.user_message().to_owned())
            }
        }
    }

    /// After the grace period, revert a still-current success back to idle
    fn spawn_grace_reset(
        state: &Arc<watch::Sender<AnalysisSnapshot>>,
        inner: &Arc<Mutex<Inner>>,
        epoch: u64,
    ) -> JoinHandle<()> {
        let state = Arc::clone(state);
        let inner = Arc::clone(inner);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(SUCCESS_GRACE_MS)).await;

            let stale = inner
                .lock()
                .map_or(true, |guard| guard.disposed || guard.epoch != epoch);
            if stale {
                return;
            }

            state.send_modify(|snapshot| {
                if snapshot.phase == AnalysisPhase::Succeeded {
                    *snapshot = AnalysisSnapshot::idle();
                }
            });
        })
    }

    fn failed(message: String) -> AnalysisSnapshot {
        AnalysisSnapshot {
            phase: AnalysisPhase::Failed,
            progress: 0,
            error: Some(message),
            last_result: None,
        }
    }
}

impl Drop for AnalysisOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
