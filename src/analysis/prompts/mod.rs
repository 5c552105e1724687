// ABOUTME: Instruction prompts for vision-model interactions loaded at compile time
// ABOUTME: Provides the food-analysis prompt that pins the expected JSON contract
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Analysis Prompts
//!
//! Prompts are loaded at compile time from markdown files for easy
//! maintenance. The food-analysis prompt defines the JSON schema the model
//! must answer with and the refusal contract for non-food images.

/// Food-image analysis instruction prompt
///
/// Defines the expected JSON response schema, the nutrient estimation
/// policy, and the `{"error": ...}` refusal shape for unanalyzable images.
pub const FOOD_ANALYSIS_PROMPT: &str = include_str!("food_analysis.md");

/// Get the instruction prompt sent with every analysis request
#[must_use]
pub const fn get_food_analysis_prompt() -> &'static str {
    FOOD_ANALYSIS_PROMPT
}
