// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `noctis stats` command implementation.

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;
use serde::Serialize;

use crate::context;

/// Structured stats output for `--json` mode.
#[derive(Debug, Serialize)]
struct StatsOutput {
    total_memories: i64,
    by_category: Vec<(String, i64)>,
    pending_extraction: i64,
    entity_count: i64,
    tag_count: i64,
    avg_importance: f64,
}

pub async fn run(
    config: &NoctisConfig,
    agent: Option<&str>,
    json: bool,
) -> Result<(), NoctisError> {
    let store = context::open_store(config).await?;
    let stats = store.stats(agent).await?;

    if json {
        let output = StatsOutput {
            total_memories: stats.total_memories,
            by_category: stats.by_category.clone(),
            pending_extraction: stats.pending_extraction,
            entity_count: stats.entity_count,
            tag_count: stats.tag_count,
            avg_importance: stats.avg_importance,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    println!();
    println!("  noctis stats");
    println!("  {}", "-".repeat(35));
    println!("    Memories:   {}", stats.total_memories);
    for (category, count) in &stats.by_category {
        println!("      {category:<12} {count}");
    }
    println!("    Pending:    {}", stats.pending_extraction);
    println!("    Entities:   {}", stats.entity_count);
    println!("    Tags:       {}", stats.tag_count);
    println!("    Avg imp.:   {:.2}", stats.avg_importance);
    println!();
    Ok(())
}
