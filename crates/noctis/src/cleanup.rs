// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `noctis cleanup` command implementation.
//!
//! A targeted manual pass over what the sleep cycle's decay and cleanup
//! phases would remove. Dry-run by default; `--execute` deletes.

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;
use noctis_sleep::patterns::is_noise;
use noctis_store::DecayOptions;

use crate::context;

pub async fn run(
    config: &NoctisConfig,
    execute: bool,
    all: bool,
    agent: Option<&str>,
) -> Result<(), NoctisError> {
    let store = context::open_store(config).await?;

    let candidates = store
        .decay_candidates(DecayOptions {
            half_life_days: config.decay.half_life_days,
            category_half_lives: config
                .decay
                .category_half_lives
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            importance_multiplier: config.decay.importance_multiplier,
            retention_threshold: config.decay.retention_threshold,
            agent_id: agent.map(str::to_string),
        })
        .await?;

    if candidates.is_empty() {
        println!("no decayed memories");
    } else {
        println!("{} decayed memories:", candidates.len());
        for candidate in &candidates {
            println!(
                "  {}  score={:.3}  {}",
                candidate.id,
                candidate.decay_score,
                preview(&candidate.text)
            );
        }
    }

    let noise: Vec<(String, String)> = if all {
        store
            .list_texts(agent, false)
            .await?
            .into_iter()
            .filter(|(_, text, _)| is_noise(text))
            .map(|(id, text, _)| (id, text))
            .collect()
    } else {
        Vec::new()
    };
    if all {
        if noise.is_empty() {
            println!("no noise memories");
        } else {
            println!("{} noise memories:", noise.len());
            for (id, text) in &noise {
                println!("  {}  {}", id, preview(text));
            }
        }
    }

    if !execute {
        if all {
            let entities = store.orphan_entities().await?;
            let tags = store.orphan_tags().await?;
            let stale = store
                .stale_single_use_tags(config.sleep.single_use_tag_min_age_days)
                .await?;
            println!(
                "{} orphan entities, {} orphan tags, {} stale single-use tags",
                entities.len(),
                tags.len(),
                stale.len()
            );
        }
        println!("dry run; pass --execute to delete");
        return Ok(());
    }

    let mut ids: Vec<String> = candidates.into_iter().map(|c| c.id).collect();
    ids.extend(noise.into_iter().map(|(id, _)| id));
    let pruned = if ids.is_empty() {
        0
    } else {
        store.purge_memories(ids).await?
    };
    println!("pruned {pruned} memories");

    if all {
        let entities = store.delete_orphan_entities().await?;
        let tags = store.delete_orphan_tags().await?;
        let stale = store
            .delete_stale_single_use_tags(config.sleep.single_use_tag_min_age_days)
            .await?;
        println!("removed {entities} orphan entities, {tags} orphan tags, {stale} stale tags");
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(60).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}
