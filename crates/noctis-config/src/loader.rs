// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./noctis.toml` > `~/.config/noctis/noctis.toml`
//! > `/etc/noctis/noctis.toml`, with environment variable overrides via the
//! `NOCTIS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::NoctisConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/noctis/noctis.toml` (system-wide)
/// 3. `~/.config/noctis/noctis.toml` (user XDG config)
/// 4. `./noctis.toml` (local directory)
/// 5. `NOCTIS_*` environment variables
pub fn load_config() -> Result<NoctisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NoctisConfig::default()))
        .merge(Toml::file("/etc/noctis/noctis.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("noctis/noctis.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("noctis.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<NoctisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NoctisConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NoctisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NoctisConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. `NOCTIS_STORE_DATABASE_PATH` must map to
/// `store.database_path`, not `store.database.path`.
fn env_provider() -> Env {
    Env::prefixed("NOCTIS_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("store_", "store.", 1)
            .replacen("embedding_", "embedding.", 1)
            .replacen("reasoning_", "reasoning.", 1)
            .replacen("search_", "search.", 1)
            .replacen("decay_", "decay.", 1)
            .replacen("sleep_", "sleep.", 1)
            .replacen("hooks_", "hooks.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.agent_id, "default");
        assert_eq!(config.store.embedding_dimensions, 768);
        assert!((config.sleep.dedup_threshold - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [sleep]
            dedup_threshold = 0.9
            llm_concurrency = 4

            [decay]
            half_life_days = 14.0
            "#,
        )
        .unwrap();
        assert!((config.sleep.dedup_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.sleep.llm_concurrency, 4);
        assert!((config.decay.half_life_days - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn loads_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noctis.toml");
        std::fs::write(&path, "[agent]\nagent_id = \"file-agent\"\n").unwrap();
        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.agent.agent_id, "file-agent");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
            [sleep]
            dedup_treshold = 0.9
            "#,
        );
        assert!(result.is_err(), "typo'd key must be rejected");
    }

    #[test]
    fn category_half_life_map_parses() {
        let config = load_config_from_str(
            r#"
            [decay.category_half_lives]
            preference = 90.0
            fact = 45.0
            "#,
        )
        .unwrap();
        assert!((config.decay.category_half_lives["preference"] - 90.0).abs() < f64::EPSILON);
    }
}
