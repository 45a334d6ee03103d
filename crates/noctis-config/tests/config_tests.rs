// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Noctis configuration system.

use noctis_config::model::NoctisConfig;
use noctis_config::{load_config_from_str, validate_config};

/// Valid TOML with fields across every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_noctis_config() {
    let toml = r#"
[agent]
agent_id = "research-agent"
log_level = "debug"

[store]
database_path = "/tmp/test.db"
embedding_dimensions = 384

[embedding]
base_url = "http://localhost:8080/v1"
model = "all-minilm"

[reasoning]
base_url = "http://localhost:11434/v1"
model = "llama3.1:8b"

[search]
min_score = 0.4
graph_hops = 3

[decay]
half_life_days = 14.0
retention_threshold = 0.05

[decay.category_half_lives]
task = 7.0

[sleep]
dedup_threshold = 0.9
llm_concurrency = 4

[hooks]
auto_capture = false
recall_limit = 3
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.agent_id, "research-agent");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.store.database_path, "/tmp/test.db");
    assert_eq!(config.store.embedding_dimensions, 384);
    assert_eq!(config.embedding.base_url, "http://localhost:8080/v1");
    assert_eq!(config.embedding.model, "all-minilm");
    assert_eq!(
        config.reasoning.base_url.as_deref(),
        Some("http://localhost:11434/v1")
    );
    assert_eq!(config.search.min_score, 0.4);
    assert_eq!(config.search.graph_hops, 3);
    assert_eq!(config.decay.half_life_days, 14.0);
    assert_eq!(config.decay.category_half_lives.get("task"), Some(&7.0));
    assert_eq!(config.sleep.dedup_threshold, 0.9);
    assert_eq!(config.sleep.llm_concurrency, 4);
    assert!(!config.hooks.auto_capture);
    assert_eq!(config.hooks.recall_limit, 3);
    assert!(validate_config(&config).is_ok());
}

/// Unknown field in [agent] section is rejected at deserialize time.
#[test]
fn unknown_field_in_agent_produces_error() {
    let toml = r#"
[agent]
agnet_id = "test"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("agnet_id"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown field in [sleep] section is rejected at deserialize time.
#[test]
fn unknown_field_in_sleep_produces_error() {
    let toml = r#"
[sleep]
dedup_treshold = 0.9
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("dedup_treshold"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Missing sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.agent_id, "default");
    assert_eq!(config.agent.log_level, "info");
    assert_eq!(config.store.embedding_dimensions, 768);
    assert_eq!(config.embedding.base_url, "http://127.0.0.1:11434/v1");
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert!(config.reasoning.base_url.is_none());
    assert_eq!(config.search.min_score, 0.3);
    assert_eq!(config.search.rrf_k, 60.0);
    assert_eq!(config.search.graph_hops, 2);
    assert_eq!(config.decay.half_life_days, 30.0);
    assert_eq!(config.decay.retention_threshold, 0.1);
    assert_eq!(config.sleep.dedup_threshold, 0.95);
    assert_eq!(config.sleep.cluster_fetch_threshold, 0.75);
    assert_eq!(config.sleep.semantic_prescreen, 0.80);
    assert!(config.hooks.auto_capture);
    assert!(!config.hooks.auto_sleep);
    assert_eq!(config.hooks.recall_limit, 5);
    assert!(validate_config(&config).is_ok());
}

/// A later layer overrides an earlier one for the same key.
#[test]
fn later_layer_overrides_agent_id() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let toml_content = r#"
[agent]
agent_id = "from-toml"
"#;

    let config: NoctisConfig = Figment::new()
        .merge(Serialized::defaults(NoctisConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("agent.agent_id", "from-env"))
        .extract()
        .expect("should merge the override");

    assert_eq!(config.agent.agent_id, "from-env");
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: NoctisConfig = Figment::new()
        .merge(Serialized::defaults(NoctisConfig::default()))
        .merge(Toml::file("/nonexistent/path/noctis.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.agent.agent_id, "default");
}

/// Validation collects every broken constraint rather than failing fast.
#[test]
fn validation_collects_all_errors() {
    let mut config = NoctisConfig::default();
    config.store.embedding_dimensions = 0;
    config.search.min_score = 1.5;
    config.search.graph_hops = 7;
    config.sleep.llm_concurrency = 0;

    let errors = validate_config(&config).expect_err("should fail validation");
    assert_eq!(errors.len(), 4);
    let rendered: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
    assert!(rendered.iter().any(|m| m.contains("embedding_dimensions")));
    assert!(rendered.iter().any(|m| m.contains("search.min_score")));
    assert!(rendered.iter().any(|m| m.contains("graph_hops")));
    assert!(rendered.iter().any(|m| m.contains("llm_concurrency")));
}

/// The cluster fetch threshold must sit at or below the dedup threshold.
#[test]
fn cluster_fetch_above_dedup_is_rejected() {
    let toml = r#"
[sleep]
dedup_threshold = 0.8
cluster_fetch_threshold = 0.9
"#;

    let config = load_config_from_str(toml).expect("TOML itself is valid");
    let errors = validate_config(&config).expect_err("should fail validation");
    assert!(
        errors
            .iter()
            .any(|e| e.message.contains("cluster_fetch_threshold"))
    );
}
