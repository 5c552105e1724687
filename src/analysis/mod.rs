// ABOUTME: Food-image analysis pipeline: client seam, orchestrator, and prompts
// ABOUTME: Defines the FoodAnalyzer contract and the image payload transport type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Food-Image Analysis Pipeline
//!
//! This module owns the one genuinely hard subsystem of the application:
//! turning a photographed meal into validated, typed nutrition state.
//!
//! ## Key Concepts
//!
//! - **`ImagePayload`**: a base64-encoded JPEG ready for transport
//! - **`FoodAnalyzer`**: async contract for one analysis request/response
//!   cycle; implemented by [`VisionAnalysisClient`], mocked in tests
//! - **`AnalysisOrchestrator`**: the lifecycle state machine around one
//!   analysis (progress simulation, store hand-off, grace-period reset)
//!
//! The model's free-text output is an untrusted boundary: it is parsed to an
//! intermediate untyped value, validated against the schema, and only then
//! constructed into a [`FoodAnalysisResult`](crate::models::FoodAnalysisResult).

pub mod client;
pub mod orchestrator;
pub mod prompts;

pub use client::{VisionAnalysisClient, VisionClientConfig};
pub use orchestrator::{AnalysisOrchestrator, AnalysisPhase, AnalysisSnapshot, OrchestratorConfig};

use async_trait::async_trait;
use base64::Engine as _;

use crate::errors::{AppError, AppResult};
use crate::models::FoodAnalysisResult;

/// A still image encoded for transport: base64 JPEG
///
/// The capture adapter (camera or gallery picker) produces this; the format
/// itself is not validated here — a non-JPEG payload surfaces downstream as
/// a model refusal or parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload(String);

impl ImagePayload {
    /// Wrap an already base64-encoded payload
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the payload is empty.
    pub fn from_base64(encoded: impl Into<String>) -> AppResult<Self> {
        let encoded = encoded.into();
        if encoded.is_empty() {
            return Err(AppError::invalid_input("Image payload must not be empty"));
        }
        Ok(Self(encoded))
    }

    /// Encode raw image bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the byte slice is empty.
    pub fn from_bytes(bytes: &[u8]) -> AppResult<Self> {
        if bytes.is_empty() {
            return Err(AppError::invalid_input("Image payload must not be empty"));
        }
        Ok(Self(
            base64::engine::general_purpose::STANDARD.encode(bytes),
        ))
    }

    /// The base64 payload
    #[must_use]
    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// The payload as an inline data URL for the vision endpoint
    #[must_use]
    pub fn as_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.0)
    }
}

/// Contract for one analysis request/response cycle
///
/// Implementations are stateless across calls and safe to share behind an
/// `Arc`. The orchestrator depends on this trait rather than the concrete
/// HTTP client so its state machine can be exercised with scripted results.
#[async_trait]
pub trait FoodAnalyzer: Send + Sync {
    /// Analyze one food image into a validated result, or fail explicitly
    ///
    /// # Errors
    ///
    /// - `Transport` on network/HTTP failure
    /// - `ModelRefused` when the model declines the image
    /// - `MalformedResponse` when the model output fails schema validation
    async fn analyze(&self, image: &ImagePayload) -> AppResult<FoodAnalysisResult>;

    /// Check that the analysis endpoint is reachable and the credential valid
    ///
    /// # Errors
    ///
    /// Returns a `Transport` error if the endpoint cannot be reached at all.
    async fn health_check(&self) -> AppResult<bool>;
}
