// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid search orchestrator: classify, run the three signals in parallel,
//! fuse, record retrievals.

use std::sync::Arc;

use noctis_config::SearchConfig;
use noctis_core::NoctisError;
use noctis_core::traits::EmbeddingBackend;
use noctis_core::types::ScoredMemory;
use noctis_store::MemoryStore;
use tracing::{debug, warn};

use crate::classify::{classify_query, signal_weights};
use crate::fuse::{RankedSignal, fuse_signals, normalize_fused_scores};

/// Minimum top score required before display normalization kicks in.
const NORMALIZATION_FLOOR: f64 = 0.01;

pub struct HybridSearch {
    store: Arc<MemoryStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    config: SearchConfig,
    /// Graph search only makes sense once extraction populates the graph;
    /// without a reasoning backend it stays off.
    graph_enabled: bool,
}

impl HybridSearch {
    pub fn new(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        config: SearchConfig,
        graph_enabled: bool,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            graph_enabled,
        }
    }

    /// Search memories for a free-text query, returning up to `limit`
    /// results ranked by fused relevance.
    ///
    /// An empty or whitespace-only query returns an empty list without
    /// touching any backend.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        agent_id: Option<&str>,
    ) -> Result<Vec<ScoredMemory>, NoctisError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_type = classify_query(query);
        let (vector_weight, bm25_weight, graph_weight) =
            signal_weights(query_type, self.graph_enabled);
        let candidates = (limit * self.config.candidate_multiplier).min(self.config.candidate_cap);
        debug!(?query_type, candidates, "running hybrid search");

        let embedding = self.embedder.embed(query).await?;

        let vector_fut =
            self.store
                .vector_signal(&embedding, candidates, self.config.min_score, agent_id);
        let bm25_fut = self.store.keyword_signal(
            query,
            candidates,
            self.config.bm25_floor,
            agent_id,
        );
        let graph_fut = async {
            if self.graph_enabled {
                self.store
                    .graph_signal(query, candidates, self.config.graph_hops, agent_id)
                    .await
            } else {
                Vec::new()
            }
        };
        let (vector_results, bm25_results, graph_results) =
            tokio::join!(vector_fut, bm25_fut, graph_fut);

        let signals = [
            RankedSignal {
                weight: vector_weight,
                results: vector_results,
            },
            RankedSignal {
                weight: bm25_weight,
                results: bm25_results,
            },
            RankedSignal {
                weight: graph_weight,
                results: graph_results,
            },
        ];
        let mut fused = fuse_signals(&signals, self.config.rrf_k);
        fused.truncate(limit);
        normalize_fused_scores(&mut fused, NORMALIZATION_FLOOR);

        let mut results = Vec::with_capacity(fused.len());
        for (id, text, score) in fused {
            // A candidate can vanish between signal fetch and enrichment;
            // drop it rather than surface half a row.
            match self.store.get(&id).await? {
                Some(memory) => results.push(ScoredMemory {
                    id,
                    text,
                    category: memory.category,
                    importance: memory.importance,
                    score,
                }),
                None => debug!(id, "search candidate disappeared before enrichment"),
            }
        }

        self.record_retrievals(&results);
        Ok(results)
    }

    /// Fire-and-forget retrieval tracking. Failures are logged and
    /// swallowed; tracking is an optimization, not a correctness
    /// requirement.
    fn record_retrievals(&self, results: &[ScoredMemory]) {
        if results.is_empty() {
            return;
        }
        let ids: Vec<String> = results.iter().map(|r| r.id.clone()).collect();
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.record_retrieval(ids).await {
                warn!(error = %e, "failed to record retrieval event");
            }
        });
    }
}
