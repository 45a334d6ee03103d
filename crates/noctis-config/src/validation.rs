// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as threshold ranges and non-zero batch sizes.

use crate::model::NoctisConfig;

/// A configuration validation error.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &NoctisConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.store.database_path.trim().is_empty() {
        errors.push(ConfigError::new("store.database_path must not be empty"));
    }

    if config.store.embedding_dimensions == 0 {
        errors.push(ConfigError::new(
            "store.embedding_dimensions must be greater than zero",
        ));
    }

    check_unit_range(&mut errors, "search.min_score", config.search.min_score);
    check_unit_range(&mut errors, "search.bm25_floor", config.search.bm25_floor);
    check_unit_range(
        &mut errors,
        "sleep.dedup_threshold",
        config.sleep.dedup_threshold,
    );
    check_unit_range(
        &mut errors,
        "sleep.cluster_fetch_threshold",
        config.sleep.cluster_fetch_threshold,
    );
    check_unit_range(
        &mut errors,
        "sleep.semantic_prescreen",
        config.sleep.semantic_prescreen,
    );
    check_unit_range(
        &mut errors,
        "decay.retention_threshold",
        config.decay.retention_threshold,
    );

    if config.sleep.cluster_fetch_threshold > config.sleep.dedup_threshold {
        errors.push(ConfigError::new(format!(
            "sleep.cluster_fetch_threshold ({}) must not exceed sleep.dedup_threshold ({})",
            config.sleep.cluster_fetch_threshold, config.sleep.dedup_threshold
        )));
    }

    if config.search.candidate_multiplier == 0 {
        errors.push(ConfigError::new(
            "search.candidate_multiplier must be greater than zero",
        ));
    }

    if !(1..=3).contains(&config.search.graph_hops) {
        errors.push(ConfigError::new(format!(
            "search.graph_hops must be between 1 and 3, got {}",
            config.search.graph_hops
        )));
    }

    if config.decay.half_life_days <= 0.0 {
        errors.push(ConfigError::new(format!(
            "decay.half_life_days must be positive, got {}",
            config.decay.half_life_days
        )));
    }

    for (category, days) in &config.decay.category_half_lives {
        if *days <= 0.0 {
            errors.push(ConfigError::new(format!(
                "decay.category_half_lives.{category} must be positive, got {days}"
            )));
        }
    }

    if config.sleep.llm_concurrency == 0 {
        errors.push(ConfigError::new(
            "sleep.llm_concurrency must be greater than zero",
        ));
    }

    if config.sleep.extraction_batch_size == 0 {
        errors.push(ConfigError::new(
            "sleep.extraction_batch_size must be greater than zero",
        ));
    }

    if config.hooks.recall_limit == 0 {
        errors.push(ConfigError::new(
            "hooks.recall_limit must be greater than zero",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_unit_range(errors: &mut Vec<ConfigError>, key: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::new(format!(
            "{key} must be between 0.0 and 1.0, got {value}"
        )));
    }
}

/// Render collected errors to stderr, one line each.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("noctis: config error: {error}");
    }
}
