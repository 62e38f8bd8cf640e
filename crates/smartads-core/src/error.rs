// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for SmartAds.

use thiserror::Error;

/// Top-level error type for all SmartAds operations.
#[derive(Debug, Error)]
pub enum SmartAdsError {
    // -- Input validation --
    #[error("invalid ads configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid engagement parameters: {0}")]
    InvalidParameters(String),

    #[error("decision point cannot be null or empty")]
    InvalidDecisionPoint,

    // -- Lifecycle --
    #[error("ads are not registered")]
    NotRegistered,

    #[error("ad service has been destroyed")]
    Destroyed,

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SmartAdsError>;
