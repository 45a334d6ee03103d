// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store-side row types and operation results.

use noctis_core::types::{ExtractionStatus, MemoryCategory, MemorySource};

/// Input for creating a new memory.
#[derive(Debug, Clone)]
pub struct MemoryDraft {
    pub text: String,
    pub embedding: Vec<f32>,
    pub importance: f64,
    pub category: MemoryCategory,
    pub source: MemorySource,
    pub agent_id: String,
    pub session_key: Option<String>,
    /// Skipped extraction is used for imports that arrive pre-structured.
    pub extraction_status: ExtractionStatus,
}

/// A memory pending structure extraction.
#[derive(Debug, Clone)]
pub struct PendingMemory {
    pub id: String,
    pub text: String,
    pub extraction_retries: i64,
}

/// One member of a duplicate cluster.
#[derive(Debug, Clone)]
pub struct ClusterMember {
    pub id: String,
    pub importance: f64,
}

/// A connected component of near-duplicate memories.
#[derive(Debug, Clone)]
pub struct DuplicateCluster {
    pub members: Vec<ClusterMember>,
    /// Pairwise similarities (id_a, id_b, score), present when the caller
    /// asked for them. Lets callers re-bucket by similarity band without a
    /// second scan.
    pub similarities: Option<Vec<(String, String, f64)>>,
}

/// Result of merging a duplicate cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub survivor_id: String,
    pub deleted_count: usize,
}

/// A memory whose decay score fell below the retention threshold.
#[derive(Debug, Clone)]
pub struct DecayedMemory {
    pub id: String,
    pub text: String,
    pub category: MemoryCategory,
    pub importance: f64,
    pub decay_score: f64,
}

/// Options controlling a decay scan.
#[derive(Debug, Clone)]
pub struct DecayOptions {
    pub half_life_days: f64,
    pub category_half_lives: Vec<(String, f64)>,
    pub importance_multiplier: f64,
    pub retention_threshold: f64,
    pub agent_id: Option<String>,
}

/// A candidate pair of entities for name-based dedup.
#[derive(Debug, Clone)]
pub struct EntityPair {
    pub a_id: String,
    pub a_name: String,
    pub a_mentions: i64,
    pub b_id: String,
    pub b_name: String,
    pub b_mentions: i64,
}

/// Two memories that share at least one mentioned entity.
#[derive(Debug, Clone)]
pub struct ConflictCandidate {
    pub a_id: String,
    pub a_text: String,
    pub a_importance: f64,
    pub b_id: String,
    pub b_text: String,
    pub b_importance: f64,
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_memories: i64,
    pub by_category: Vec<(String, i64)>,
    pub pending_extraction: i64,
    pub entity_count: i64,
    pub tag_count: i64,
    pub avg_importance: f64,
}
