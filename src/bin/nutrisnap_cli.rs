// ABOUTME: NutriSnap CLI - exercises the analysis pipeline from the command line
// ABOUTME: Analyze a meal photo, watch the lifecycle, print totals and goals remaining
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap
//!
//! Usage:
//! ```bash
//! # Analyze a meal photo and fold it into today's totals
//! nutrisnap-cli analyze --image lunch.jpg
//!
//! # Show current totals, goals remaining, and the recent-meals log
//! nutrisnap-cli status
//!
//! # Check that the analysis endpoint is reachable
//! nutrisnap-cli health
//! ```

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use nutrisnap::analysis::{AnalysisPhase, ImagePayload};
use nutrisnap::config::AppConfig;
use nutrisnap::context::AppContext;
use nutrisnap::logging::LoggingConfig;

#[derive(Parser)]
#[command(
    name = "nutrisnap-cli",
    about = "NutriSnap analysis pipeline CLI",
    long_about = "Runs the food-image analysis pipeline end to end: encode a photo, \
                  send it for analysis, and fold the validated result into local nutrition state."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Analyze one meal photo
    Analyze {
        /// Path to a JPEG image
        #[arg(long)]
        image: PathBuf,
    },

    /// Show totals, goals remaining, and recent meals
    Status,

    /// Check the analysis endpoint
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env().init()?;

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(database_url) = cli.database_url {
        config.storage.database_url = database_url;
    }

    let ctx = AppContext::bootstrap(config).await?;

    let outcome = match cli.command {
        Command::Analyze { image } => analyze(&ctx, &image).await,
        Command::Status => status(&ctx).await,
        Command::Health => health(&ctx).await,
    };

    ctx.shutdown();
    outcome
}

/// Run one analysis and follow the lifecycle until it settles
async fn analyze(ctx: &AppContext, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read image {}", path.display()))?;
    let image = ImagePayload::from_bytes(&bytes)?;

    let mut states = ctx.orchestrator.subscribe();
    ctx.orchestrator.start(image)?;

    loop {
        states
            .changed()
            .await
            .context("Orchestrator state channel closed")?;
        let snapshot = states.borrow().clone();

        match snapshot.phase {
            AnalysisPhase::InProgress => {
                eprint!("\ranalyzing... {:>3}%", snapshot.progress);
            }
            AnalysisPhase::Succeeded => {
                let Some(result) = snapshot.last_result else {
                    continue;
                };
                eprintln!("\ranalyzing... 100%");
                println!("\n{}", result.name);
                println!(
                    "  {} kcal | {}g protein | {}g carbs | {}g fat",
                    result.nutritional_info.calories,
                    result.nutritional_info.proteins,
                    result.nutritional_info.carbs,
                    result.nutritional_info.fats
                );
                println!(
                    "  portion: {} ({}g), health score {}/10, confidence {}%",
                    result.portion.size,
                    result.portion.weight,
                    result.health_score,
                    result.confidence
                );
                for recommendation in &result.recommendations {
                    println!("  tip: {recommendation}");
                }
                break;
            }
            AnalysisPhase::Failed => {
                let message = snapshot.error.unwrap_or_else(|| "unknown error".to_owned());
                eprintln!("\ranalysis failed: {message}");
                ctx.orchestrator.dismiss_error();
                return Ok(());
            }
            AnalysisPhase::Idle => {}
        }
    }

    status(ctx).await
}

/// Print totals, goals remaining, and the recent-meals log
async fn status(ctx: &AppContext) -> Result<()> {
    let data = ctx.store.nutrition_data().await;
    let remaining = ctx.store.goals_remaining().await;

    println!("\ntoday:");
    println!(
        "  consumed: {} kcal | {}g protein | {}g carbs | {}g fat",
        data.consumed.calories, data.consumed.proteins, data.consumed.carbs, data.consumed.fats
    );
    println!(
        "  remaining: {} kcal | {}g protein | {}g carbs | {}g fat",
        remaining.calories, remaining.proteins, remaining.carbs, remaining.fats
    );

    let meals = ctx.store.recent_meals().await;
    if !meals.is_empty() {
        println!("recent meals:");
        for meal in meals {
            println!(
                "  {} - {} ({} kcal)",
                meal.timestamp.format("%H:%M"),
                meal.name,
                meal.nutritional_info.calories
            );
        }
    }

    Ok(())
}

/// Check the analysis endpoint
async fn health(ctx: &AppContext) -> Result<()> {
    let healthy = ctx.analyzer.health_check().await?;
    if healthy {
        println!("analysis endpoint: ok");
    } else {
        println!("analysis endpoint: unreachable or credential rejected");
    }
    Ok(())
}
