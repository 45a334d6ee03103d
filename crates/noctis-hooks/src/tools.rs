// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The three tool calls exposed to the host agent: recall, store, forget.
//!
//! Tool responses are structured action shapes; internal errors are logged
//! and replaced with a generic message, never surfaced verbatim to the
//! agent.

use std::sync::Arc;

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;
use noctis_core::traits::{EmbeddingBackend, ReasoningBackend};
use noctis_core::types::{
    DEFAULT_IMPORTANCE, ExtractionStatus, MemoryCategory, MemorySource, ScoredMemory,
};
use noctis_search::HybridSearch;
use noctis_store::{MemoryDraft, MemoryStore, is_valid_uuid};
use serde::Serialize;
use tracing::{debug, warn};

/// Score above which a forget-by-query match is deleted without asking.
const AUTO_FORGET_THRESHOLD: f64 = 0.95;

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StoreResponse {
    /// A near-duplicate already exists; nothing was written.
    Duplicate { id: String, similarity: f64 },
    Created { id: String },
    Error { message: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ForgetResponse {
    Deleted { id: String },
    NotFound,
    /// Multiple or low-confidence matches; the agent must disambiguate.
    Candidates { candidates: Vec<ScoredMemory> },
    Error { message: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecallResponse {
    Results {
        rendered: String,
        results: Vec<ScoredMemory>,
    },
    Error {
        message: String,
    },
}

pub struct MemoryTools {
    store: Arc<MemoryStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    reasoner: Option<Arc<dyn ReasoningBackend>>,
    search: Arc<HybridSearch>,
    agent_id: String,
    recall_limit: usize,
    dedup_threshold: f64,
}

impl MemoryTools {
    pub fn new(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        reasoner: Option<Arc<dyn ReasoningBackend>>,
        search: Arc<HybridSearch>,
        config: &NoctisConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            reasoner,
            search,
            agent_id: config.agent.agent_id.clone(),
            recall_limit: config.hooks.recall_limit,
            dedup_threshold: config.sleep.dedup_threshold,
        }
    }

    fn agent(&self) -> Option<&str> {
        Some(self.agent_id.as_str())
    }

    /// `memory_recall`: ranked hybrid search plus a rendered list for
    /// direct injection into agent context.
    pub async fn memory_recall(&self, query: &str, limit: Option<usize>) -> RecallResponse {
        let limit = limit.unwrap_or(self.recall_limit);
        match self.search.search(query, limit, self.agent()).await {
            Ok(results) => RecallResponse::Results {
                rendered: render_recall(&results),
                results,
            },
            Err(e) => {
                warn!(error = %e, "memory_recall failed");
                RecallResponse::Error {
                    message: "memory recall is temporarily unavailable".into(),
                }
            }
        }
    }

    /// `memory_store`: duplicate-check then write. The duplicate check
    /// short-circuits before any write; a failed check counts as "no
    /// duplicate found".
    pub async fn memory_store(
        &self,
        text: &str,
        importance: Option<f64>,
        category: Option<MemoryCategory>,
    ) -> StoreResponse {
        match self
            .store_inner(text, importance, category, MemorySource::User, None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "memory_store failed");
                StoreResponse::Error {
                    message: "memory could not be stored".into(),
                }
            }
        }
    }

    pub(crate) async fn store_inner(
        &self,
        text: &str,
        importance: Option<f64>,
        category: Option<MemoryCategory>,
        source: MemorySource,
        session_key: Option<String>,
    ) -> Result<StoreResponse, NoctisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NoctisError::Validation("memory text is empty".into()));
        }
        let embedding = self.embedder.embed(text).await?;

        let similar = self
            .store
            .find_similar(&embedding, 3, self.dedup_threshold, self.agent())
            .await;
        if let Some(top) = similar.first() {
            debug!(id = %top.id, score = top.score, "duplicate short-circuit");
            return Ok(StoreResponse::Duplicate {
                id: top.id.clone(),
                similarity: top.score,
            });
        }

        let category = category.unwrap_or(MemoryCategory::Other);
        let importance = match importance {
            // Core memories are importance-locked at creation.
            _ if category == MemoryCategory::Core => 1.0,
            Some(value) => value.clamp(0.0, 1.0),
            None => self.rate_importance(text).await,
        };

        let draft = MemoryDraft {
            text: text.to_string(),
            embedding,
            importance,
            category,
            source,
            agent_id: self.agent_id.clone(),
            session_key,
            extraction_status: ExtractionStatus::Pending,
        };
        let id = self.store.store_memory(draft).await?;
        Ok(StoreResponse::Created { id })
    }

    /// LLM importance when available, heuristic default otherwise. A
    /// failed rating falls back rather than blocking the write.
    async fn rate_importance(&self, text: &str) -> f64 {
        let Some(reasoner) = &self.reasoner else {
            return DEFAULT_IMPORTANCE;
        };
        match reasoner.rate_importance(text).await {
            Ok(rating) => rating.as_importance(),
            Err(e) => {
                debug!(error = %e, "importance rating failed, using default");
                DEFAULT_IMPORTANCE
            }
        }
    }

    /// `memory_forget`: direct delete by id, or search-then-delete. A
    /// query only auto-deletes when it produces exactly one match scoring
    /// at or above the auto-forget threshold.
    pub async fn memory_forget(
        &self,
        query: Option<&str>,
        memory_id: Option<&str>,
    ) -> ForgetResponse {
        if let Some(id) = memory_id {
            if !is_valid_uuid(id) {
                return ForgetResponse::Error {
                    message: "memory id is not a valid UUID".into(),
                };
            }
            return match self.store.delete(id, self.agent()).await {
                Ok(true) => ForgetResponse::Deleted { id: id.to_string() },
                Ok(false) => ForgetResponse::NotFound,
                Err(e) => {
                    warn!(error = %e, "memory_forget failed");
                    ForgetResponse::Error {
                        message: "memory could not be deleted".into(),
                    }
                }
            };
        }

        let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
            return ForgetResponse::Error {
                message: "provide either a query or a memory id".into(),
            };
        };
        let matches = match self.search.search(query, 5, self.agent()).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "memory_forget search failed");
                return ForgetResponse::Error {
                    message: "memory search is temporarily unavailable".into(),
                };
            }
        };
        match matches.as_slice() {
            [] => ForgetResponse::NotFound,
            [only] if only.score >= AUTO_FORGET_THRESHOLD => {
                match self.store.delete(&only.id, self.agent()).await {
                    Ok(true) => ForgetResponse::Deleted {
                        id: only.id.clone(),
                    },
                    Ok(false) => ForgetResponse::NotFound,
                    Err(e) => {
                        warn!(error = %e, "memory_forget failed");
                        ForgetResponse::Error {
                            message: "memory could not be deleted".into(),
                        }
                    }
                }
            }
            _ => ForgetResponse::Candidates {
                candidates: matches,
            },
        }
    }
}

/// Render recall results as a compact ranked list.
fn render_recall(results: &[ScoredMemory]) -> String {
    if results.is_empty() {
        return "No relevant memories found.".to_string();
    }
    let mut out = String::from("Relevant memories:\n");
    for (i, memory) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{:.0}%] {}\n",
            i + 1,
            memory.score * 100.0,
            memory.text
        ));
    }
    out
}
