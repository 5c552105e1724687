// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Typed sections for the vision endpoint, storage paths, and analysis tuning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! Environment-based configuration management

use crate::errors::{AppError, AppResult};
use std::env;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Base URL of the vision chat-completions endpoint (backend proxy)
const VISION_BASE_URL_ENV: &str = "NUTRISNAP_VISION_BASE_URL";

/// Bearer credential for the vision endpoint
const VISION_API_KEY_ENV: &str = "NUTRISNAP_VISION_API_KEY";

/// Model identifier sent with every analysis request
const VISION_MODEL_ENV: &str = "NUTRISNAP_VISION_MODEL";

/// Local SQLite database URL
const DATABASE_URL_ENV: &str = "NUTRISNAP_DATABASE_URL";

/// Base URL of the remote persistence service (optional)
const REMOTE_BASE_URL_ENV: &str = "NUTRISNAP_REMOTE_BASE_URL";

/// API key for the remote persistence service
const REMOTE_API_KEY_ENV: &str = "NUTRISNAP_REMOTE_API_KEY";

/// Identity the meal records are associated with
const USER_ID_ENV: &str = "NUTRISNAP_USER_ID";

/// Overall analysis deadline in seconds
const ANALYSIS_TIMEOUT_ENV: &str = "NUTRISNAP_ANALYSIS_TIMEOUT_SECS";

// ============================================================================
// Defaults
// ============================================================================

const DEFAULT_VISION_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 60;
const DEFAULT_USER_ID: &str = "local";

/// Vision endpoint configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Base URL of the chat-completions API (backend proxy)
    pub base_url: String,
    /// Bearer credential
    pub api_key: String,
    /// Model identifier
    pub model: String,
}

impl VisionConfig {
    /// Load from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if the API key is not set.
    pub fn from_env() -> AppResult<Self> {
        let api_key = env::var(VISION_API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::config_missing(VISION_API_KEY_ENV))?;

        Ok(Self {
            base_url: env::var(VISION_BASE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_VISION_BASE_URL.to_owned()),
            api_key,
            model: env::var(VISION_MODEL_ENV).unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_owned()),
        })
    }
}

/// Storage configuration: local database plus the optional remote service
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite database URL for the on-device store
    pub database_url: String,
    /// Remote persistence base URL; `None` disables the remote path
    pub remote_base_url: Option<String>,
    /// API key for the remote persistence service
    pub remote_api_key: Option<String>,
    /// Identity that owns the persisted records
    pub user_id: String,
}

impl StorageConfig {
    /// Load from environment variables
    ///
    /// The database URL defaults to a `nutrisnap.db` file in the platform
    /// data directory, falling back to the working directory when no data
    /// directory can be resolved.
    #[must_use]
    pub fn from_env() -> Self {
        let database_url =
            env::var(DATABASE_URL_ENV).unwrap_or_else(|_| default_database_url());

        Self {
            database_url,
            remote_base_url: env::var(REMOTE_BASE_URL_ENV).ok().filter(|v| !v.is_empty()),
            remote_api_key: env::var(REMOTE_API_KEY_ENV).ok().filter(|v| !v.is_empty()),
            user_id: env::var(USER_ID_ENV).unwrap_or_else(|_| DEFAULT_USER_ID.to_owned()),
        }
    }

    /// Whether a remote persistence path is configured
    #[must_use]
    pub const fn remote_enabled(&self) -> bool {
        self.remote_base_url.is_some()
    }
}

/// Analysis pipeline tuning
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Overall deadline for one analysis, in seconds
    pub timeout_secs: u64,
}

impl AnalysisConfig {
    /// Load from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the timeout is set but not a positive integer.
    pub fn from_env() -> AppResult<Self> {
        let timeout_secs = match env::var(ANALYSIS_TIMEOUT_ENV) {
            Ok(raw) => raw.parse::<u64>().ok().filter(|t| *t > 0).ok_or_else(|| {
                AppError::config_invalid(format!(
                    "{ANALYSIS_TIMEOUT_ENV} must be a positive integer, got {raw:?}"
                ))
            })?,
            Err(_) => DEFAULT_ANALYSIS_TIMEOUT_SECS,
        };

        Ok(Self { timeout_secs })
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_ANALYSIS_TIMEOUT_SECS,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Vision endpoint section
    pub vision: VisionConfig,
    /// Storage section
    pub storage: StorageConfig,
    /// Analysis tuning section
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load the full configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if any required value is missing or unparseable.
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            vision: VisionConfig::from_env()?,
            storage: StorageConfig::from_env(),
            analysis: AnalysisConfig::from_env()?,
        };

        info!(
            vision_base_url = %config.vision.base_url,
            model = %config.vision.model,
            database_url = %config.storage.database_url,
            remote = config.storage.remote_enabled(),
            "Configuration loaded"
        );

        Ok(config)
    }
}

/// Default on-device database location
fn default_database_url() -> String {
    let dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    format!("sqlite:{}", dir.join("nutrisnap.db").display())
}
