// ABOUTME: Unified error handling for the NutriSnap analysis pipeline
// ABOUTME: Defines standard error codes and the AppError type used across all modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! # Unified Error Handling System
//!
//! This module provides a centralized error handling system for the NutriSnap
//! core. It defines standard error codes and a single `AppError` type so that
//! every failure mode of the analysis pipeline — transport, model refusal,
//! malformed model output, persistence, configuration — is represented
//! consistently and can be folded into a human-readable message at the
//! orchestrator boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Analysis pipeline (1000-1999)
    /// Network/HTTP failure reaching the analysis endpoint
    #[serde(rename = "TRANSPORT_ERROR")]
    Transport = 1000,
    /// The model explicitly declined to analyze the image
    #[serde(rename = "MODEL_REFUSED")]
    ModelRefused = 1001,
    /// The model's output could not be parsed or validated against the schema
    #[serde(rename = "MALFORMED_RESPONSE")]
    MalformedResponse = 1002,
    /// An analysis is already in flight on this orchestrator
    #[serde(rename = "ANALYSIS_BUSY")]
    AnalysisBusy = 1003,
    /// The analysis did not complete within the configured deadline
    #[serde(rename = "ANALYSIS_TIMEOUT")]
    AnalysisTimeout = 1004,

    // Validation (3000-3999)
    /// Caller-supplied input failed validation
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // Persistence (4000-4999)
    /// Write/read failure against the on-device store
    #[serde(rename = "STORAGE_LOCAL_ERROR")]
    StorageLocal = 4000,
    /// Write/read failure against the remote store
    #[serde(rename = "STORAGE_REMOTE_ERROR")]
    StorageRemote = 4001,

    // Configuration (6000-6999)
    /// A required configuration value is absent
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6000,
    /// A configuration value is present but unusable
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6001,

    // Internal Errors (9000-9999)
    /// Unclassified internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    Internal = 9000,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Transport => "Could not reach the analysis service",
            Self::ModelRefused => "The image could not be analyzed",
            Self::MalformedResponse => "The analysis service returned an unusable response",
            Self::AnalysisBusy => "An analysis is already in progress",
            Self::AnalysisTimeout => "The analysis timed out",
            Self::InvalidInput => "The provided input is invalid",
            Self::StorageLocal => "Device storage operation failed",
            Self::StorageRemote => "Remote storage operation failed",
            Self::ConfigMissing => "Required configuration is missing",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::Internal => "An internal error occurred",
        }
    }

    /// Whether this failure mode is expected during normal operation and
    /// correctable by the user (retake the photo, retry later)
    #[must_use]
    pub const fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::ModelRefused | Self::Transport | Self::AnalysisBusy | Self::AnalysisTimeout
        )
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The message shown to the user when this error surfaces in the UI
    #[must_use]
    pub fn user_message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience functions for creating common errors
impl AppError {
    /// Transport failure with the HTTP status that came back
    #[must_use]
    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Transport,
            format!("HTTP {status}: {}", message.into()),
        )
    }

    /// The model declined to analyze the image; carries the model's own text
    #[must_use]
    pub fn model_refused(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ModelRefused, message)
    }

    /// Model output failed schema validation
    #[must_use]
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedResponse, message)
    }

    /// An analysis is already in flight
    #[must_use]
    pub fn busy() -> Self {
        Self::new(
            ErrorCode::AnalysisBusy,
            "An analysis is already in progress",
        )
    }

    /// The analysis deadline expired
    #[must_use]
    pub fn timeout(secs: u64) -> Self {
        Self::new(
            ErrorCode::AnalysisTimeout,
            format!("Analysis did not complete within {secs}s"),
        )
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// On-device storage error
    #[must_use]
    pub fn storage_local(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageLocal, message)
    }

    /// Remote storage error
    #[must_use]
    pub fn storage_remote(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageRemote, message)
    }

    /// Missing configuration value
    #[must_use]
    pub fn config_missing(what: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigMissing,
            format!("{} is not set", what.into()),
        )
    }

    /// Invalid configuration value
    #[must_use]
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

/// Conversion from `anyhow::Error` (storage trait boundary) to `AppError`
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::Internal, error.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::new(ErrorCode::StorageLocal, error.to_string()).with_source(error)
    }
}
