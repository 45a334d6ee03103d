// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed memory store for Noctis.
//!
//! One database file holds three search surfaces over the same rows: a vec0
//! vector index for semantic similarity, an FTS5 index for BM25 keyword
//! search, and entity/mention/link tables forming the knowledge graph. All
//! access goes through a single background connection; multi-step mutations
//! are single SQL transactions.

pub mod database;
pub mod models;
pub mod queries;
pub mod retry;
pub mod schema;
pub mod store;

pub use database::Database;
pub use models::{
    ClusterMember, ConflictCandidate, DecayOptions, DecayedMemory, DuplicateCluster, EntityPair,
    MemoryDraft, MergeOutcome, PendingMemory, StoreStats,
};
pub use retry::retry_on_transient;
pub use schema::{RELATIONSHIP_ALLOWLIST, escape_fts_query, is_allowed_relationship, is_valid_uuid};
pub use store::MemoryStore;
