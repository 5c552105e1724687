// ABOUTME: Vision chat-completions client for food-image analysis
// ABOUTME: Builds the multimodal request and strictly validates the model's JSON reply
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Vision Analysis Client
//!
//! Translates a raw image payload into a validated
//! [`FoodAnalysisResult`](crate::models::FoodAnalysisResult), or fails
//! explicitly. Works against any `OpenAI`-compatible chat-completions
//! endpoint with vision support, which is what the backend proxy exposes.
//!
//! The model's completion text is an untrusted boundary. It is handled in
//! three steps: strip any surrounding code fences, parse to an untyped
//! `serde_json::Value`, then validate field-by-field before constructing the
//! typed result. Validation is all-or-nothing — no partial result is ever
//! salvaged from a bad response.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::prompts::get_food_analysis_prompt;
use super::{FoodAnalyzer, ImagePayload};
use crate::config::VisionConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{FoodAnalysisResult, NutritionalInfo, Portion};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Connection timeout for the analysis endpoint
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Per-request timeout; the orchestrator applies its own overall deadline
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Token budget for the analysis completion
const MAX_TOKENS: u32 = 1000;

/// Low temperature keeps the schema-constrained output stable
const TEMPERATURE: f32 = 0.1;

/// The six required nutrient fields of the response contract
const NUTRIENT_FIELDS: [&str; 6] = ["calories", "proteins", "carbs", "fats", "fiber", "sugar"];

// ============================================================================
// API Request/Response Types (OpenAI-compatible vision format)
// ============================================================================

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct VisionRequest {
    model: String,
    messages: Vec<VisionMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// A message carrying multimodal content parts
#[derive(Debug, Serialize)]
struct VisionMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

/// One part of a multimodal message
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    /// Instruction text
    Text {
        /// The prompt text
        text: String,
    },
    /// Inline image reference
    ImageUrl {
        /// Data URL wrapper
        image_url: ImageUrl,
    },
}

/// Inline data-URL image reference
#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Chat-completions response body
#[derive(Debug, Deserialize)]
struct VisionResponse {
    choices: Vec<VisionChoice>,
}

/// Choice in response
#[derive(Debug, Deserialize)]
struct VisionChoice {
    message: VisionResponseMessage,
}

/// Message in response
#[derive(Debug, Deserialize)]
struct VisionResponseMessage {
    content: Option<String>,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the vision analysis client
#[derive(Debug, Clone)]
pub struct VisionClientConfig {
    /// Base URL for the chat-completions API
    pub base_url: String,
    /// Bearer credential
    pub api_key: String,
    /// Model identifier sent with every request
    pub model: String,
}

impl From<&VisionConfig> for VisionClientConfig {
    fn from(config: &VisionConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

// ============================================================================
// Client Implementation
// ============================================================================

/// Vision analysis client
///
/// Stateless beyond the pooled HTTP connection; safe to reuse across calls
/// and share behind an `Arc`.
pub struct VisionAnalysisClient {
    client: Client,
    config: VisionClientConfig,
}

impl VisionAnalysisClient {
    /// Create a new client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: VisionClientConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a client from the application's vision configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &VisionConfig) -> AppResult<Self> {
        Self::new(VisionClientConfig::from(config))
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Build the multimodal request body for one image
    fn build_request(&self, image: &ImagePayload) -> VisionRequest {
        VisionRequest {
            model: self.config.model.clone(),
            messages: vec![VisionMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: get_food_analysis_prompt().to_owned(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.as_data_url(),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }

    /// Parse an error response body from the API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        let message = serde_json::from_str::<ApiErrorResponse>(body).map_or_else(
            |_| {
                let snippet: String = body.chars().take(200).collect();
                if snippet.is_empty() {
                    "no response body".to_owned()
                } else {
                    snippet
                }
            },
            |e| e.error.message,
        );

        AppError::transport(status.as_u16(), message)
    }
}

#[async_trait]
impl FoodAnalyzer for VisionAnalysisClient {
    #[instrument(skip(self, image))]
    async fn analyze(&self, image: &ImagePayload) -> AppResult<FoodAnalysisResult> {
        let request = self.build_request(image);

        debug!(
            model = %self.config.model,
            payload_len = image.as_base64().len(),
            "Sending food-image analysis request"
        );

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Analysis request failed: {e}");
                AppError::new(ErrorCode::Transport, format!("Request failed: {e}"))
                    .with_source(e)
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Analysis endpoint returned error status");
            return Err(Self::parse_error_response(status, &body));
        }

        let body: VisionResponse = response.json().await.map_err(|e| {
            AppError::malformed_response(format!("Response body was not valid JSON: {e}"))
        })?;

        let completion = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::malformed_response("Response contained no completion text"))?;

        parse_analysis_response(&completion)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> AppResult<bool> {
        let response = self
            .client
            .get(self.api_url("models"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await
            .map_err(|e| {
                AppError::new(ErrorCode::Transport, format!("Health check failed: {e}"))
            })?;

        Ok(response.status().is_success())
    }
}

// ============================================================================
// Decode-then-Validate Boundary
// ============================================================================

/// Parse and validate the model's completion text into a typed result
///
/// Strips surrounding code fences, parses to an untyped value, detects the
/// model's own `{"error": ...}` refusal signal, then validates every
/// required field before constructing the result.
///
/// # Errors
///
/// - `ModelRefused` when the payload carries an `error` field
/// - `MalformedResponse` on parse failure or any schema violation
pub fn parse_analysis_response(completion: &str) -> AppResult<FoodAnalysisResult> {
    let stripped = strip_code_fences(completion);

    let value: Value = serde_json::from_str(stripped)
        .map_err(|e| AppError::malformed_response(format!("Completion was not JSON: {e}")))?;

    // The model's own refusal signal is a normal, expected failure mode.
    if let Some(message) = value.get("error") {
        let text = message
            .as_str()
            .map_or_else(|| message.to_string(), ToOwned::to_owned);
        return Err(AppError::model_refused(text));
    }

    validate_result(&value)
}

/// Strip a surrounding triple-backtick fence, with or without a language tag
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag line ("json", "JSON", empty)
    let rest = rest
        .split_once('\n')
        .map_or(rest, |(_tag, body)| body);

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Validate an untyped payload against the analysis schema
fn validate_result(value: &Value) -> AppResult<FoodAnalysisResult> {
    let name = require_string(value, "name")?;

    let info = value
        .get("nutritionalInfo")
        .ok_or_else(|| AppError::malformed_response("Missing required field: nutritionalInfo"))?;

    let nutritional_info = validate_nutrients(info)?;

    let portion_value = value
        .get("portion")
        .ok_or_else(|| AppError::malformed_response("Missing required field: portion"))?;
    let portion = Portion {
        size: require_string(portion_value, "size")?,
        weight: require_number(portion_value, "weight")?,
    };

    let health_score = require_number(value, "healthScore")?;
    // The contract pins healthScore to an integer in [1, 10]; a fractional
    // or out-of-range score is brought into range rather than rejected.
    let health_score = (health_score.round() as i64).clamp(1, 10);

    let confidence = require_number(value, "confidence")?.clamp(0.0, 100.0);

    Ok(FoodAnalysisResult {
        name,
        ingredients: string_list(value, "ingredients"),
        nutritional_info,
        portion,
        health_score,
        recommendations: string_list(value, "recommendations"),
        allergies: string_list(value, "allergies"),
        confidence,
    })
}

/// Validate the six-field nutrient record; every field numeric, non-negative
fn validate_nutrients(info: &Value) -> AppResult<NutritionalInfo> {
    let mut values = [0.0_f64; 6];

    for (slot, field) in values.iter_mut().zip(NUTRIENT_FIELDS) {
        let number = require_number(info, field)
            .map_err(|_| AppError::malformed_response(format!(
                "nutritionalInfo.{field} is missing or not numeric"
            )))?;

        if number < 0.0 {
            return Err(AppError::malformed_response(format!(
                "nutritionalInfo.{field} is negative"
            )));
        }

        *slot = number;
    }

    let [calories, proteins, carbs, fats, fiber, sugar] = values;

    Ok(NutritionalInfo {
        calories,
        proteins,
        carbs,
        fats,
        fiber,
        sugar,
    })
}

/// Extract a required string field
fn require_string(value: &Value, field: &str) -> AppResult<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            AppError::malformed_response(format!("Missing or non-string field: {field}"))
        })
}

/// Extract a required finite number field
fn require_number(value: &Value, field: &str) -> AppResult<f64> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            AppError::malformed_response(format!("Missing or non-numeric field: {field}"))
        })
}

/// Extract an optional list of strings; non-string entries are dropped
fn string_list(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
