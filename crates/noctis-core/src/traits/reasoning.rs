// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reasoning backend trait for LLM-assisted structure extraction and verdicts.

use async_trait::async_trait;

use crate::error::NoctisError;
use crate::types::{ConflictVerdict, DuplicateVerdict, ExtractionOutcome, ImportanceRating};

/// Backend for LLM calls that return structured JSON.
///
/// Four call shapes: extraction, importance rating, semantic-duplicate
/// verdict, conflict-resolution verdict. Malformed JSON and non-2xx statuses
/// are permanent failures; a fixed transient-status allowlist is retried by
/// the implementation with exponential backoff.
#[async_trait]
pub trait ReasoningBackend: Send + Sync + 'static {
    /// Extract entities, relationships, tags, and a category from memory text.
    async fn extract(&self, text: &str) -> Result<ExtractionOutcome, NoctisError>;

    /// Rate the long-term importance of a memory on a 1-10 scale.
    async fn rate_importance(&self, text: &str) -> Result<ImportanceRating, NoctisError>;

    /// Decide whether two memories state the same fact.
    async fn judge_duplicate(&self, a: &str, b: &str) -> Result<DuplicateVerdict, NoctisError>;

    /// Decide which of two conflicting memories to keep.
    async fn resolve_conflict(&self, a: &str, b: &str) -> Result<ConflictVerdict, NoctisError>;
}
