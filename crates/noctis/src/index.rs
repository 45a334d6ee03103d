// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `noctis index` command implementation.
//!
//! Re-embeds every memory and rebuilds the vector index. Used after
//! switching embedding models or changing dimensionality.

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;

use crate::context;

pub async fn run(config: &NoctisConfig, batch_size: usize) -> Result<(), NoctisError> {
    if batch_size == 0 {
        return Err(NoctisError::Validation(
            "--batch-size must be greater than zero".to_string(),
        ));
    }
    let mut store = context::open_store(config).await?;
    let embedder = context::embedder(config)?;

    println!("reindexing with model {} ...", config.embedding.model);
    let reindexed = store.reindex(embedder.as_ref(), batch_size).await?;
    println!("reindexed {reindexed} memories");
    Ok(())
}
