// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `noctis search` command implementation.

use std::sync::Arc;

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;
use noctis_search::HybridSearch;

use crate::context;

pub async fn run(
    config: &NoctisConfig,
    query: &str,
    limit: usize,
    agent: Option<&str>,
    json: bool,
) -> Result<(), NoctisError> {
    if limit == 0 {
        return Err(NoctisError::Validation(
            "--limit must be greater than zero".to_string(),
        ));
    }
    let store = Arc::new(context::open_store(config).await?);
    let embedder = context::embedder(config)?;
    let graph_enabled = config.reasoning.base_url.is_some();
    let search = HybridSearch::new(store, embedder, config.search.clone(), graph_enabled);

    let results = search.search(query, limit, agent).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results)
                .unwrap_or_else(|_| "[]".to_string())
        );
        return Ok(());
    }

    if results.is_empty() {
        println!("no results");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        println!(
            "{:2}. [{:.0}%] [{}] {}",
            i + 1,
            result.score * 100.0,
            result.category.as_str(),
            result.text
        );
    }
    Ok(())
}
