// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared command setup: config loading, tracing init, and wiring the
//! store/embedding/reasoning backends from configuration.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use noctis_config::{NoctisConfig, render_errors, validate_config};
use noctis_core::NoctisError;
use noctis_core::traits::{EmbeddingBackend, ReasoningBackend};
use noctis_embed::EmbedClient;
use noctis_reason::ReasonClient;
use noctis_store::MemoryStore;

/// Load and validate configuration, rendering errors to stderr on failure.
pub fn load(path: Option<&Path>) -> Result<NoctisConfig, ExitCode> {
    let loaded = match path {
        Some(path) => noctis_config::load_config_from_path(path),
        None => noctis_config::load_config(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("noctis: config error: {e}");
            return Err(ExitCode::FAILURE);
        }
    };
    if let Err(errors) = validate_config(&config) {
        render_errors(&errors);
        return Err(ExitCode::FAILURE);
    }
    Ok(config)
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("noctis={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

pub async fn open_store(config: &NoctisConfig) -> Result<MemoryStore, NoctisError> {
    MemoryStore::open(config).await
}

pub fn embedder(config: &NoctisConfig) -> Result<Arc<dyn EmbeddingBackend>, NoctisError> {
    let client = EmbedClient::new(&config.embedding, config.store.embedding_dimensions)?;
    Ok(Arc::new(client))
}

/// The reasoning backend is optional; `None` means no LLM is configured.
pub fn reasoner(config: &NoctisConfig) -> Result<Option<Arc<dyn ReasoningBackend>>, NoctisError> {
    Ok(ReasonClient::from_config(&config.reasoning)?
        .map(|client| Arc::new(client) as Arc<dyn ReasoningBackend>))
}

/// Reject a numeric flag value outside its documented range.
pub fn check_positive(name: &str, value: Option<f64>) -> Result<(), NoctisError> {
    if let Some(v) = value
        && v <= 0.0
    {
        return Err(NoctisError::Validation(format!(
            "--{name} must be positive, got {v}"
        )));
    }
    Ok(())
}

pub fn check_unit_range(name: &str, value: Option<f64>) -> Result<(), NoctisError> {
    if let Some(v) = value
        && !(0.0..=1.0).contains(&v)
    {
        return Err(NoctisError::Validation(format!(
            "--{name} must be between 0.0 and 1.0, got {v}"
        )));
    }
    Ok(())
}

pub fn check_nonzero(name: &str, value: Option<usize>) -> Result<(), NoctisError> {
    if let Some(0) = value {
        return Err(NoctisError::Validation(format!(
            "--{name} must be greater than zero"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_range_rejects_out_of_bounds() {
        assert!(check_unit_range("dedup-threshold", Some(1.5)).is_err());
        assert!(check_unit_range("dedup-threshold", Some(0.9)).is_ok());
        assert!(check_unit_range("dedup-threshold", None).is_ok());
    }

    #[test]
    fn positive_rejects_zero_and_negative() {
        assert!(check_positive("decay-half-life", Some(0.0)).is_err());
        assert!(check_positive("decay-half-life", Some(-3.0)).is_err());
        assert!(check_positive("decay-half-life", Some(30.0)).is_ok());
    }

    #[test]
    fn nonzero_rejects_zero() {
        assert!(check_nonzero("batch-size", Some(0)).is_err());
        assert!(check_nonzero("batch-size", Some(50)).is_ok());
    }
}
