// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! High-level store facade.
//!
//! Wraps the raw query layer with transient-error retry and, for the search
//! signals, degrade-to-empty semantics: a failed signal is a warning and an
//! empty result set, never a failed search.

use std::time::Duration;

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;
use noctis_core::traits::EmbeddingBackend;
use noctis_core::types::{Entity, ExtractionOutcome, Memory, MemoryCategory, SimilarMemory};
use tracing::warn;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{
    ConflictCandidate, DecayOptions, DecayedMemory, DuplicateCluster, EntityPair, MemoryDraft,
    MergeOutcome, PendingMemory, StoreStats,
};
use crate::queries;
use crate::retry::retry_on_transient;
use crate::schema::is_valid_uuid;

/// Over-fetch factor for agent-scoped vector queries. The vector index
/// cannot pre-filter by agent, so scoped KNN fetches extra candidates and
/// filters afterwards.
const AGENT_OVERFETCH: usize = 3;

pub struct MemoryStore {
    db: Database,
    max_retries: u32,
    base_delay: Duration,
}

impl MemoryStore {
    /// Open the store at the configured path, provisioning the schema if
    /// this is a fresh database.
    pub async fn open(config: &NoctisConfig) -> Result<Self, NoctisError> {
        let db = Database::open(
            std::path::Path::new(&config.store.database_path),
            config.store.embedding_dimensions,
        )
        .await?;
        Ok(Self {
            db,
            max_retries: config.store.max_retries,
            base_delay: Duration::from_millis(config.store.retry_base_delay_ms),
        })
    }

    /// In-memory store for tests and dry runs.
    pub async fn open_in_memory(dimensions: usize) -> Result<Self, NoctisError> {
        Ok(Self {
            db: Database::open_in_memory(dimensions).await?,
            max_retries: 2,
            base_delay: Duration::from_millis(10),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.db.dimensions()
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, f: F) -> Result<T, NoctisError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, NoctisError>>,
    {
        retry_on_transient(op, self.max_retries, self.base_delay, f).await
    }

    // Memory lifecycle

    /// Validate and persist a new memory, returning its generated id.
    pub async fn store_memory(&self, draft: MemoryDraft) -> Result<String, NoctisError> {
        if draft.text.trim().is_empty() {
            return Err(NoctisError::Validation("memory text is empty".into()));
        }
        if draft.embedding.len() != self.db.dimensions() {
            return Err(NoctisError::Validation(format!(
                "embedding has {} dimensions, index expects {}",
                draft.embedding.len(),
                self.db.dimensions()
            )));
        }
        if !(0.0..=1.0).contains(&draft.importance) {
            return Err(NoctisError::Validation(format!(
                "importance {} outside [0, 1]",
                draft.importance
            )));
        }
        let id = Uuid::new_v4().to_string();
        self.with_retry("insert_memory", || {
            queries::memories::insert_memory(&self.db, id.clone(), draft.clone())
        })
        .await?;
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Memory>, NoctisError> {
        self.with_retry("get_memory", || queries::memories::get_memory(&self.db, id))
            .await
    }

    /// Delete a memory by id, optionally scoped to an agent. Ids are
    /// validated as UUIDs before they reach SQL.
    pub async fn delete(&self, id: &str, agent_id: Option<&str>) -> Result<bool, NoctisError> {
        if !is_valid_uuid(id) {
            return Err(NoctisError::Validation(format!(
                "'{id}' is not a valid memory id"
            )));
        }
        self.with_retry("delete_memory", || {
            queries::memories::delete_memory(&self.db, id, agent_id)
        })
        .await
    }

    pub async fn list(
        &self,
        agent_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Memory>, NoctisError> {
        self.with_retry("list_memories", || {
            queries::memories::list_memories(&self.db, agent_id, limit, offset)
        })
        .await
    }

    pub async fn core_memories(&self, agent_id: Option<&str>) -> Result<Vec<Memory>, NoctisError> {
        self.with_retry("list_core_memories", || {
            queries::memories::list_core_memories(&self.db, agent_id)
        })
        .await
    }

    pub async fn list_texts(
        &self,
        agent_id: Option<&str>,
        include_core: bool,
    ) -> Result<Vec<(String, String, MemoryCategory)>, NoctisError> {
        self.with_retry("list_texts", || {
            queries::memories::list_texts(&self.db, agent_id, include_core)
        })
        .await
    }

    pub async fn record_retrieval(&self, ids: Vec<String>) -> Result<(), NoctisError> {
        self.with_retry("record_retrieval", || {
            queries::memories::record_retrieval(&self.db, ids.clone())
        })
        .await
    }

    /// Soft-delete: drop importance to the invalidated floor so the memory
    /// falls out of ranking but survives until the next decay pass.
    pub async fn invalidate(&self, id: &str) -> Result<(), NoctisError> {
        self.with_retry("invalidate_memory", || {
            queries::memories::invalidate_memory(&self.db, id)
        })
        .await
    }

    pub async fn stats(&self, agent_id: Option<&str>) -> Result<StoreStats, NoctisError> {
        self.with_retry("stats", || queries::memories::stats(&self.db, agent_id))
            .await
    }

    // Search signals: degrade to empty

    /// Vector signal. Agent-scoped queries over-fetch to compensate for
    /// post-hoc filtering. Failures degrade to an empty result.
    pub async fn vector_signal(
        &self,
        embedding: &[f32],
        k: usize,
        min_score: f64,
        agent_id: Option<&str>,
    ) -> Vec<(String, String, f64)> {
        let fetch = if agent_id.is_some() {
            k.saturating_mul(AGENT_OVERFETCH)
        } else {
            k
        };
        match queries::search::knn(&self.db, embedding, fetch, min_score, agent_id).await {
            Ok(mut results) => {
                results.truncate(k);
                results
            }
            Err(e) => {
                warn!(error = %e, "vector signal failed, degrading to empty");
                Vec::new()
            }
        }
    }

    /// Keyword (BM25) signal. Failures degrade to an empty result.
    pub async fn keyword_signal(
        &self,
        query: &str,
        limit: usize,
        floor: f64,
        agent_id: Option<&str>,
    ) -> Vec<(String, String, f64)> {
        match queries::search::bm25_search(&self.db, query, limit, floor, agent_id).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "keyword signal failed, degrading to empty");
                Vec::new()
            }
        }
    }

    /// Graph signal. Failures degrade to an empty result.
    pub async fn graph_signal(
        &self,
        query: &str,
        limit: usize,
        hops: u32,
        agent_id: Option<&str>,
    ) -> Vec<(String, String, f64)> {
        match queries::search::graph_search(&self.db, query, limit, hops, agent_id).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "graph signal failed, degrading to empty");
                Vec::new()
            }
        }
    }

    /// Nearest neighbors at or above `min_score`, for duplicate checks at
    /// store time. The cutoff is applied inside the query. Failures degrade
    /// to an empty result so a broken index never blocks a write.
    pub async fn find_similar(
        &self,
        embedding: &[f32],
        k: usize,
        min_score: f64,
        agent_id: Option<&str>,
    ) -> Vec<SimilarMemory> {
        self.vector_signal(embedding, k, min_score, agent_id)
            .await
            .into_iter()
            .map(|(id, text, score)| SimilarMemory { id, text, score })
            .collect()
    }

    // Extraction

    pub async fn pending_extraction(
        &self,
        limit: usize,
        agent_id: Option<&str>,
    ) -> Result<Vec<PendingMemory>, NoctisError> {
        self.with_retry("pending_extraction", || {
            queries::memories::find_pending_extraction(&self.db, limit, agent_id)
        })
        .await
    }

    pub async fn apply_extraction(
        &self,
        memory_id: &str,
        outcome: ExtractionOutcome,
    ) -> Result<(), NoctisError> {
        self.with_retry("apply_extraction", || {
            queries::entities::apply_extraction(&self.db, memory_id, outcome.clone())
        })
        .await
    }

    pub async fn mark_extraction_failed(&self, memory_id: &str) -> Result<(), NoctisError> {
        self.with_retry("mark_extraction_failed", || {
            queries::memories::mark_extraction_failed(&self.db, memory_id)
        })
        .await
    }

    // Entities and tags

    pub async fn entity_by_name(&self, name: &str) -> Result<Option<Entity>, NoctisError> {
        self.with_retry("entity_by_name", || {
            queries::entities::get_entity_by_name(&self.db, name)
        })
        .await
    }

    pub async fn duplicate_entity_pairs(&self) -> Result<Vec<EntityPair>, NoctisError> {
        self.with_retry("duplicate_entity_pairs", || {
            queries::entities::find_duplicate_entity_pairs(&self.db)
        })
        .await
    }

    pub async fn merge_entities(
        &self,
        keep_id: &str,
        drop_id: &str,
    ) -> Result<(), NoctisError> {
        self.with_retry("merge_entities", || {
            queries::entities::merge_entity_pair(&self.db, keep_id, drop_id)
        })
        .await
    }

    pub async fn reconcile_mention_counts(&self) -> Result<usize, NoctisError> {
        self.with_retry("reconcile_mention_counts", || {
            queries::entities::reconcile_mention_counts(&self.db)
        })
        .await
    }

    pub async fn orphan_entities(&self) -> Result<Vec<(String, String)>, NoctisError> {
        self.with_retry("orphan_entities", || {
            queries::entities::find_orphan_entities(&self.db)
        })
        .await
    }

    pub async fn delete_orphan_entities(&self) -> Result<usize, NoctisError> {
        self.with_retry("delete_orphan_entities", || {
            queries::entities::delete_orphan_entities(&self.db)
        })
        .await
    }

    pub async fn orphan_tags(&self) -> Result<Vec<(String, String)>, NoctisError> {
        self.with_retry("find_orphan_tags", || {
            queries::tags::find_orphan_tags(&self.db)
        })
        .await
    }

    pub async fn stale_single_use_tags(
        &self,
        min_age_days: f64,
    ) -> Result<Vec<(String, String)>, NoctisError> {
        self.with_retry("find_stale_single_use_tags", || {
            queries::tags::find_stale_single_use_tags(&self.db, min_age_days)
        })
        .await
    }

    pub async fn delete_orphan_tags(&self) -> Result<usize, NoctisError> {
        self.with_retry("delete_orphan_tags", || {
            queries::tags::delete_orphan_tags(&self.db)
        })
        .await
    }

    pub async fn delete_stale_single_use_tags(
        &self,
        min_age_days: f64,
    ) -> Result<usize, NoctisError> {
        self.with_retry("delete_stale_single_use_tags", || {
            queries::tags::delete_stale_single_use_tags(&self.db, min_age_days)
        })
        .await
    }

    // Maintenance scans

    pub async fn duplicate_clusters(
        &self,
        threshold: f64,
        agent_id: Option<&str>,
        return_similarities: bool,
        max_pairs: usize,
    ) -> Result<Vec<DuplicateCluster>, NoctisError> {
        self.with_retry("duplicate_clusters", || {
            queries::clusters::find_duplicate_clusters(
                &self.db,
                threshold,
                agent_id,
                return_similarities,
                max_pairs,
            )
        })
        .await
    }

    pub async fn merge_cluster(
        &self,
        ids: Vec<String>,
        importances: Vec<f64>,
    ) -> Result<MergeOutcome, NoctisError> {
        self.with_retry("merge_cluster", || {
            queries::clusters::merge_memory_cluster(&self.db, ids.clone(), importances.clone())
        })
        .await
    }

    pub async fn conflict_candidates(
        &self,
        limit: usize,
        agent_id: Option<&str>,
    ) -> Result<Vec<ConflictCandidate>, NoctisError> {
        self.with_retry("conflict_candidates", || {
            queries::clusters::find_conflict_candidates(&self.db, limit, agent_id)
        })
        .await
    }

    pub async fn decay_candidates(
        &self,
        opts: DecayOptions,
    ) -> Result<Vec<DecayedMemory>, NoctisError> {
        self.with_retry("decay_candidates", || {
            queries::decay::find_decay_candidates(&self.db, opts.clone())
        })
        .await
    }

    pub async fn purge_memories(&self, ids: Vec<String>) -> Result<usize, NoctisError> {
        self.with_retry("purge_memories", || {
            queries::decay::purge_memories(&self.db, ids.clone())
        })
        .await
    }

    // Reindexing

    /// Re-embed every memory with `backend` and rebuild the vector index at
    /// the backend's dimensionality. Returns the number of rows reindexed.
    ///
    /// Takes exclusive access: reindexing drops the vector table, so no
    /// concurrent searches may run.
    pub async fn reindex(
        &mut self,
        backend: &dyn EmbeddingBackend,
        batch_size: usize,
    ) -> Result<usize, NoctisError> {
        let rows = queries::memories::list_texts(&self.db, None, true).await?;
        self.db
            .recreate_vector_index(backend.dimensions())
            .await?;
        let mut reindexed = 0usize;
        for chunk in rows.chunks(batch_size.max(1)) {
            let texts: Vec<String> = chunk.iter().map(|(_, text, _)| text.clone()).collect();
            let embeddings = backend.embed_batch(&texts).await?;
            if embeddings.len() != chunk.len() {
                return Err(NoctisError::Embedding {
                    message: format!(
                        "backend returned {} embeddings for {} texts",
                        embeddings.len(),
                        chunk.len()
                    ),
                    source: None,
                });
            }
            for ((id, _, _), embedding) in chunk.iter().zip(embeddings) {
                queries::memories::update_embedding(&self.db, id, embedding).await?;
                reindexed += 1;
            }
        }
        Ok(reindexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noctis_core::types::{ExtractionStatus, MemorySource};

    fn draft(text: &str, embedding: Vec<f32>) -> MemoryDraft {
        MemoryDraft {
            text: text.into(),
            embedding,
            importance: 0.7,
            category: MemoryCategory::Fact,
            source: MemorySource::User,
            agent_id: "default".into(),
            session_key: None,
            extraction_status: ExtractionStatus::Pending,
        }
    }

    #[tokio::test]
    async fn store_and_get_roundtrip() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let id = store
            .store_memory(draft("Alice prefers tea", vec![0.1, 0.2, 0.3, 0.4]))
            .await
            .unwrap();
        let memory = store.get(&id).await.unwrap().unwrap();
        assert_eq!(memory.text, "Alice prefers tea");
        assert_eq!(memory.retrieval_count, 0);
    }

    #[tokio::test]
    async fn reopened_file_store_retains_memories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NoctisConfig::default();
        config.store.database_path = dir
            .path()
            .join("noctis.db")
            .to_str()
            .unwrap()
            .to_string();
        config.store.embedding_dimensions = 4;

        let store = MemoryStore::open(&config).await.unwrap();
        let id = store
            .store_memory(draft("persisted across reopen", vec![0.4, 0.3, 0.2, 0.1]))
            .await
            .unwrap();
        drop(store);

        let store = MemoryStore::open(&config).await.unwrap();
        let memory = store.get(&id).await.unwrap().unwrap();
        assert_eq!(memory.text, "persisted across reopen");
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let err = store
            .store_memory(draft("   ", vec![0.0; 4]))
            .await
            .unwrap_err();
        assert!(matches!(err, NoctisError::Validation(_)));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let err = store
            .store_memory(draft("short vector", vec![0.0; 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, NoctisError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_rejects_malformed_ids() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let err = store
            .delete("1; DROP TABLE memories", None)
            .await
            .unwrap_err();
        assert!(matches!(err, NoctisError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_scoped_to_other_agent_is_a_noop() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let id = store
            .store_memory(draft("scoped", vec![0.5; 4]))
            .await
            .unwrap();
        assert!(!store.delete(&id, Some("someone-else")).await.unwrap());
        assert!(store.delete(&id, Some("default")).await.unwrap());
    }

    #[tokio::test]
    async fn find_similar_ranks_by_cosine() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        store
            .store_memory(draft("close", vec![1.0, 0.0, 0.0, 0.0]))
            .await
            .unwrap();
        store
            .store_memory(draft("far", vec![0.0, 1.0, 0.0, 0.0]))
            .await
            .unwrap();
        let similar = store
            .find_similar(&[0.9, 0.1, 0.0, 0.0], 2, 0.0, None)
            .await;
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].text, "close");
        assert!(similar[0].score > similar[1].score);
    }

    #[tokio::test]
    async fn find_similar_cutoff_drops_weak_neighbors() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        store
            .store_memory(draft("close", vec![1.0, 0.0, 0.0, 0.0]))
            .await
            .unwrap();
        store
            .store_memory(draft("far", vec![0.0, 1.0, 0.0, 0.0]))
            .await
            .unwrap();
        let similar = store
            .find_similar(&[1.0, 0.0, 0.0, 0.0], 2, 0.9, None)
            .await;
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].text, "close");
    }

    #[tokio::test]
    async fn merge_cluster_keeps_highest_importance() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let mut d1 = draft("likes coffee", vec![1.0, 0.0, 0.0, 0.0]);
        d1.importance = 0.4;
        let mut d2 = draft("enjoys coffee", vec![0.99, 0.01, 0.0, 0.0]);
        d2.importance = 0.9;
        let a = store.store_memory(d1).await.unwrap();
        let b = store.store_memory(d2).await.unwrap();
        let outcome = store
            .merge_cluster(vec![a.clone(), b.clone()], vec![0.4, 0.9])
            .await
            .unwrap();
        assert_eq!(outcome.survivor_id, b);
        assert_eq!(outcome.deleted_count, 1);
        assert!(store.get(&a).await.unwrap().is_none());
        assert!(store.get(&b).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn merge_cluster_with_missing_member_deletes_nothing() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let a = store
            .store_memory(draft("real", vec![1.0, 0.0, 0.0, 0.0]))
            .await
            .unwrap();
        let ghost = uuid::Uuid::new_v4().to_string();
        let outcome = store
            .merge_cluster(vec![a.clone(), ghost], vec![0.9, 0.4])
            .await
            .unwrap();
        assert_eq!(outcome.deleted_count, 0);
        assert!(store.get(&a).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalidate_drops_importance_to_floor() {
        let store = MemoryStore::open_in_memory(4).await.unwrap();
        let id = store
            .store_memory(draft("stale fact", vec![0.2; 4]))
            .await
            .unwrap();
        store.invalidate(&id).await.unwrap();
        let memory = store.get(&id).await.unwrap().unwrap();
        assert!(memory.importance < 0.02);
    }
}
