// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding backend trait for text-to-vector conversion.

use async_trait::async_trait;

use crate::error::NoctisError;

/// Backend that converts text into embedding vectors.
///
/// Vector dimensionality must match the store's configured index dimension
/// or vector writes fail.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync + 'static {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NoctisError>;

    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NoctisError>;

    /// Dimensionality of vectors produced by this backend.
    fn dimensions(&self) -> usize;
}
