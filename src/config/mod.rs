// ABOUTME: Configuration module for the NutriSnap core
// ABOUTME: Environment-only configuration with typed sections per subsystem
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriSnap

//! Configuration management
//!
//! NutriSnap uses environment-only configuration: every tunable is an
//! environment variable with a sensible default, and required secrets fail
//! fast at startup. There are no configuration files.

mod environment;

pub use environment::{AnalysisConfig, AppConfig, StorageConfig, VisionConfig};
