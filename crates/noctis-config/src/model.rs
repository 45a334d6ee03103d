// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Noctis memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, which catches typos early.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Noctis configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NoctisConfig {
    /// Agent identity settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Store backend settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding backend settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Reasoning (LLM) backend settings.
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Hybrid search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Decay and pruning settings.
    #[serde(default)]
    pub decay: DecayConfig,

    /// Sleep cycle settings.
    #[serde(default)]
    pub sleep: SleepConfig,

    /// Lifecycle hook settings.
    #[serde(default)]
    pub hooks: HooksConfig,
}

/// Agent identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Default agent id used when none is supplied.
    #[serde(default = "default_agent_id")]
    pub agent_id: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_id: default_agent_id(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_id() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Store backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Vector index dimensionality. Must match the embedding backend.
    #[serde(default = "default_dimensions")]
    pub embedding_dimensions: usize,

    /// Maximum retries for transient store errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            embedding_dimensions: default_dimensions(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("noctis").join("noctis.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "noctis.db".to_string())
}

fn default_dimensions() -> usize {
    768
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

/// Embedding backend configuration (OpenAI-style HTTP endpoint).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Base URL of the embeddings API (local or hosted).
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// API key, if the provider requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            api_key: None,
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_base_url() -> String {
    "http://127.0.0.1:11434/v1".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

/// Reasoning backend configuration.
///
/// `base_url = None` disables extraction, importance rating and all LLM
/// verdicts; graph search weight drops to zero in that mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReasoningConfig {
    /// Base URL of the chat-completions API. `None` disables the backend.
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key, if the provider requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier for extraction and verdict calls.
    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// Maximum retries for transient HTTP errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_reasoning_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: default_reasoning_model(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            timeout_secs: default_reasoning_timeout_secs(),
        }
    }
}

fn default_reasoning_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_reasoning_timeout_secs() -> u64 {
    60
}

/// Hybrid search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Minimum cosine similarity for vector search hits.
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Candidate over-fetch multiplier per signal (pre-fusion).
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    /// Hard cap on candidates requested per signal.
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,

    /// RRF rank constant.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,

    /// Floor for min-max-normalized BM25 scores.
    #[serde(default = "default_bm25_floor")]
    pub bm25_floor: f64,

    /// Maximum hops for graph spreading activation (1-3).
    #[serde(default = "default_graph_hops")]
    pub graph_hops: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            candidate_multiplier: default_candidate_multiplier(),
            candidate_cap: default_candidate_cap(),
            rrf_k: default_rrf_k(),
            bm25_floor: default_bm25_floor(),
            graph_hops: default_graph_hops(),
        }
    }
}

fn default_min_score() -> f64 {
    0.3
}

fn default_candidate_multiplier() -> usize {
    4
}

fn default_candidate_cap() -> usize {
    200
}

fn default_rrf_k() -> f64 {
    60.0
}

fn default_bm25_floor() -> f64 {
    0.3
}

fn default_graph_hops() -> u32 {
    2
}

/// Decay and pruning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DecayConfig {
    /// Base half-life in days, before per-category overrides.
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,

    /// Per-category half-life overrides (category name -> days).
    #[serde(default)]
    pub category_half_lives: HashMap<String, f64>,

    /// Multiplier applied to half-life per unit of importance.
    #[serde(default = "default_importance_multiplier")]
    pub importance_multiplier: f64,

    /// Decay score below which a memory becomes a pruning candidate.
    #[serde(default = "default_retention_threshold")]
    pub retention_threshold: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_half_life_days(),
            category_half_lives: HashMap::new(),
            importance_multiplier: default_importance_multiplier(),
            retention_threshold: default_retention_threshold(),
        }
    }
}

fn default_half_life_days() -> f64 {
    30.0
}

fn default_importance_multiplier() -> f64 {
    2.0
}

fn default_retention_threshold() -> f64 {
    0.1
}

/// Sleep cycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SleepConfig {
    /// Vector similarity at or above which memories merge without an LLM call.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,

    /// Lower bound for the single cluster fetch; pairs between this and
    /// `dedup_threshold` go to semantic dedup.
    #[serde(default = "default_cluster_fetch_threshold")]
    pub cluster_fetch_threshold: f64,

    /// Pairwise similarity below which no LLM duplicate call is made.
    #[serde(default = "default_semantic_prescreen")]
    pub semantic_prescreen: f64,

    /// Maximum semantic-dedup pairs per run, highest similarity first.
    #[serde(default = "default_max_semantic_pairs")]
    pub max_semantic_pairs: usize,

    /// Concurrent LLM calls within a phase.
    #[serde(default = "default_llm_concurrency")]
    pub llm_concurrency: usize,

    /// Memories per extraction batch.
    #[serde(default = "default_extraction_batch_size")]
    pub extraction_batch_size: usize,

    /// Delay between extraction batches, in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Cap on candidate pairs examined during cluster detection.
    #[serde(default = "default_max_cluster_pairs")]
    pub max_cluster_pairs: usize,

    /// Minimum age in days before a single-use tag is eligible for cleanup.
    #[serde(default = "default_single_use_tag_min_age_days")]
    pub single_use_tag_min_age_days: f64,

    /// Minimum minutes between auto-triggered sleep cycles.
    #[serde(default = "default_min_interval_minutes")]
    pub min_interval_minutes: u64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: default_dedup_threshold(),
            cluster_fetch_threshold: default_cluster_fetch_threshold(),
            semantic_prescreen: default_semantic_prescreen(),
            max_semantic_pairs: default_max_semantic_pairs(),
            llm_concurrency: default_llm_concurrency(),
            extraction_batch_size: default_extraction_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_cluster_pairs: default_max_cluster_pairs(),
            single_use_tag_min_age_days: default_single_use_tag_min_age_days(),
            min_interval_minutes: default_min_interval_minutes(),
        }
    }
}

fn default_dedup_threshold() -> f64 {
    0.95
}

fn default_cluster_fetch_threshold() -> f64 {
    0.75
}

fn default_semantic_prescreen() -> f64 {
    0.80
}

fn default_max_semantic_pairs() -> usize {
    500
}

fn default_llm_concurrency() -> usize {
    8
}

fn default_extraction_batch_size() -> usize {
    50
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_max_cluster_pairs() -> usize {
    2000
}

fn default_single_use_tag_min_age_days() -> f64 {
    7.0
}

fn default_min_interval_minutes() -> u64 {
    60
}

/// Lifecycle hook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HooksConfig {
    /// Capture conversation turns automatically at session end.
    #[serde(default = "default_auto_capture")]
    pub auto_capture: bool,

    /// Trigger a sleep cycle automatically after session end.
    #[serde(default)]
    pub auto_sleep: bool,

    /// Memories injected by auto-recall.
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Hours of inactivity before session bookkeeping is evicted.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,

    /// Minimum minutes between TTL sweeps.
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,

    /// Workspace directory for the task-ledger collaborator. `None` skips
    /// the task-ledger phase entirely.
    #[serde(default)]
    pub workspace_dir: Option<String>,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            auto_capture: default_auto_capture(),
            auto_sleep: false,
            recall_limit: default_recall_limit(),
            session_ttl_hours: default_session_ttl_hours(),
            sweep_interval_minutes: default_sweep_interval_minutes(),
            workspace_dir: None,
        }
    }
}

fn default_auto_capture() -> bool {
    true
}

fn default_recall_limit() -> usize {
    5
}

fn default_session_ttl_hours() -> u64 {
    24
}

fn default_sweep_interval_minutes() -> u64 {
    5
}
