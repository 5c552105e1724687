// ABOUTME: Integration tests for the analysis orchestrator state machine
// ABOUTME: Lifecycle transitions, simulated progress, busy rejection, timeout, teardown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    create_memory_store, grilled_chicken_salad, test_image, ScriptedAnalyzer, ScriptedOutcome,
};
use nutrisnap::analysis::{AnalysisOrchestrator, AnalysisPhase, OrchestratorConfig};
use nutrisnap::errors::ErrorCode;
use nutrisnap::nutrition::NutritionStore;

fn orchestrator(
    analyzer: Arc<ScriptedAnalyzer>,
    store: Arc<NutritionStore>,
) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(analyzer, store, OrchestratorConfig::default())
}

/// Await states until the given phase is observed, returning its snapshot
async fn wait_for_phase(
    states: &mut tokio::sync::watch::Receiver<nutrisnap::analysis::AnalysisSnapshot>,
    phase: AnalysisPhase,
) -> nutrisnap::analysis::AnalysisSnapshot {
    loop {
        let snapshot = states.borrow_and_update().clone();
        if snapshot.phase == phase {
            return snapshot;
        }
        states.changed().await.expect("state channel closed");
    }
}

// ============================================================================
// Success Flow
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_success_flow_updates_store_before_reporting() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![ScriptedOutcome::Success(
        Duration::from_secs(2),
        grilled_chicken_salad(),
    )]);
    let orch = orchestrator(analyzer, Arc::clone(&store));

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();

    let snapshot = wait_for_phase(&mut states, AnalysisPhase::Succeeded).await;

    // Progress is exactly 100 at the instant the state becomes Succeeded
    assert_eq!(snapshot.progress, 100);
    assert_eq!(
        snapshot.last_result.as_ref().unwrap().name,
        "Grilled Chicken Salad"
    );

    // Any observer that sees Succeeded also sees the updated totals
    let data = store.nutrition_data().await;
    assert!((data.consumed.calories - 420.0).abs() < f64::EPSILON);
    assert_eq!(store.recent_meals().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_success_reverts_to_idle_after_grace_period() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::success(grilled_chicken_salad());
    let orch = orchestrator(analyzer, Arc::clone(&store));

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();

    wait_for_phase(&mut states, AnalysisPhase::Succeeded).await;
    let snapshot = wait_for_phase(&mut states, AnalysisPhase::Idle).await;

    assert_eq!(snapshot.progress, 0);
    assert!(snapshot.last_result.is_none());
    assert!(snapshot.error.is_none());

    // The totals survive the display reset
    let data = store.nutrition_data().await;
    assert!((data.consumed.calories - 420.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_monotonic_and_capped_while_in_flight() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![ScriptedOutcome::Success(
        Duration::from_secs(5),
        grilled_chicken_salad(),
    )]);
    let orch = orchestrator(analyzer, store);

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();

    let mut observed = Vec::new();
    loop {
        states.changed().await.unwrap();
        let snapshot = states.borrow_and_update().clone();
        match snapshot.phase {
            AnalysisPhase::InProgress => {
                observed.push(snapshot.progress);
            }
            AnalysisPhase::Succeeded => break,
            other => panic!("unexpected phase {other:?}"),
        }
    }

    assert!(!observed.is_empty(), "expected simulated progress ticks");
    for pair in observed.windows(2) {
        assert!(pair[1] >= pair[0], "progress regressed: {observed:?}");
    }
    assert!(
        observed.iter().all(|p| *p <= 90),
        "simulated progress must stay below completion: {observed:?}"
    );
}

// ============================================================================
// Failure Flow
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_model_refusal_surfaces_message_and_leaves_state_untouched() {
    let (store, _local, remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![ScriptedOutcome::Refused(
        Duration::from_secs(1),
        "Image non analysable".to_owned(),
    )]);
    let orch = orchestrator(analyzer, Arc::clone(&store));

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();

    let snapshot = wait_for_phase(&mut states, AnalysisPhase::Failed).await;
    assert_eq!(snapshot.error.as_deref(), Some("Image non analysable"));
    assert!(snapshot.last_result.is_none());

    // Totals and meal list unchanged
    let data = store.nutrition_data().await;
    assert!((data.consumed.calories - 0.0).abs() < f64::EPSILON);
    assert!(store.recent_meals().await.is_empty());
    assert!(remote.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_sticky_until_dismissed() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![ScriptedOutcome::Transport(
        Duration::from_millis(100),
        503,
    )]);
    let orch = orchestrator(analyzer, store);

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();
    wait_for_phase(&mut states, AnalysisPhase::Failed).await;

    // Well past the success grace period: failure does not auto-revert
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(orch.snapshot().phase, AnalysisPhase::Failed);

    orch.dismiss_error();
    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, AnalysisPhase::Idle);
    assert!(snapshot.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_new_start_clears_prior_failure() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![
        ScriptedOutcome::Malformed(Duration::ZERO, "missing nutritionalInfo".to_owned()),
        ScriptedOutcome::Success(Duration::ZERO, grilled_chicken_salad()),
    ]);
    let orch = orchestrator(analyzer, store);

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();
    wait_for_phase(&mut states, AnalysisPhase::Failed).await;

    orch.start(test_image()).unwrap();
    let in_progress = orch.snapshot();
    assert!(in_progress.error.is_none());

    let snapshot = wait_for_phase(&mut states, AnalysisPhase::Succeeded).await;
    assert!(snapshot.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fails_the_analysis() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![ScriptedOutcome::Success(
        Duration::from_secs(600),
        grilled_chicken_salad(),
    )]);
    let orch = AnalysisOrchestrator::new(
        analyzer,
        Arc::clone(&store),
        OrchestratorConfig {
            timeout: Duration::from_secs(30),
        },
    );

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();

    let snapshot = wait_for_phase(&mut states, AnalysisPhase::Failed).await;
    assert!(snapshot.error.unwrap().contains("30s"));

    // The hung call never reaches the store
    let data = store.nutrition_data().await;
    assert!((data.consumed.calories - 0.0).abs() < f64::EPSILON);
}

// ============================================================================
// Concurrency Discipline
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_second_start_while_in_flight_is_rejected() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![ScriptedOutcome::Success(
        Duration::from_secs(5),
        grilled_chicken_salad(),
    )]);
    let orch = orchestrator(analyzer, store);

    orch.start(test_image()).unwrap();
    let error = orch.start(test_image()).unwrap_err();

    assert_eq!(error.code, ErrorCode::AnalysisBusy);
}

#[tokio::test(start_paused = true)]
async fn test_start_allowed_again_after_completion() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![
        ScriptedOutcome::Success(Duration::ZERO, grilled_chicken_salad()),
        ScriptedOutcome::Success(Duration::ZERO, common::porridge_bowl()),
    ]);
    let orch = orchestrator(analyzer, Arc::clone(&store));

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();
    wait_for_phase(&mut states, AnalysisPhase::Succeeded).await;

    orch.start(test_image()).unwrap();
    wait_for_phase(&mut states, AnalysisPhase::Succeeded).await;

    let data = store.nutrition_data().await;
    assert!((data.consumed.calories - 730.0).abs() < f64::EPSILON);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_ignores_late_resolution() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::new(vec![ScriptedOutcome::Success(
        Duration::from_secs(2),
        grilled_chicken_salad(),
    )]);
    let orch = orchestrator(analyzer, Arc::clone(&store));

    orch.start(test_image()).unwrap();
    orch.shutdown();

    // Give the (aborted) call's deadline plenty of room to pass
    tokio::time::sleep(Duration::from_secs(30)).await;

    // No success was ever published and the store was never touched
    assert_ne!(orch.snapshot().phase, AnalysisPhase::Succeeded);
    let data = store.nutrition_data().await;
    assert!((data.consumed.calories - 0.0).abs() < f64::EPSILON);
    assert!(store.recent_meals().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_after_shutdown_is_an_error() {
    let (store, _local, _remote) = create_memory_store("u-1");
    let analyzer = ScriptedAnalyzer::success(grilled_chicken_salad());
    let orch = orchestrator(analyzer, store);

    orch.shutdown();
    assert!(orch.start(test_image()).is_err());
}

// ============================================================================
// Local Persistence Failure
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_local_store_failure_surfaces_as_analysis_failure() {
    let (store, local, _remote) = create_memory_store("u-1");
    local.fail_writes(true);

    let analyzer = ScriptedAnalyzer::success(grilled_chicken_salad());
    let orch = orchestrator(analyzer, Arc::clone(&store));

    let mut states = orch.subscribe();
    orch.start(test_image()).unwrap();

    let snapshot = wait_for_phase(&mut states, AnalysisPhase::Failed).await;
    assert!(snapshot.error.is_some());
    assert!(store.recent_meals().await.is_empty());
}
