// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Noctis memory engine.

use thiserror::Error;

/// The primary error type used across all Noctis crates.
#[derive(Debug, Error)]
pub enum NoctisError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Store backend errors (connection, query failure, constraint violation).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding backend errors (HTTP failure, dimension mismatch).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reasoning backend errors (LLM API failure, malformed JSON response).
    ///
    /// `transient` marks errors worth retrying (429/502/503/504, timeouts,
    /// connection failures). Everything else is permanent.
    #[error("reasoning error: {message}")]
    Reasoning { message: String, transient: bool },

    /// Input failed validation before reaching any backend.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced memory, entity, or tag does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NoctisError {
    /// Whether a retry with backoff could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NoctisError::Reasoning { transient, .. } => *transient,
            NoctisError::Timeout { .. } => true,
            NoctisError::Store { source } => {
                let msg = source.to_string().to_lowercase();
                msg.contains("database is locked")
                    || msg.contains("database is busy")
                    || msg.contains("deadlock")
                    || msg.contains("connection refused")
                    || msg.contains("connection reset")
                    || msg.contains("service unavailable")
                    || msg.contains("session expired")
            }
            _ => false,
        }
    }
}
