// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `noctis list` command implementation.

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;

use crate::context;

pub async fn run(
    config: &NoctisConfig,
    agent: Option<&str>,
    limit: usize,
    offset: usize,
    json: bool,
) -> Result<(), NoctisError> {
    if limit == 0 {
        return Err(NoctisError::Validation(
            "--limit must be greater than zero".to_string(),
        ));
    }
    let store = context::open_store(config).await?;
    let memories = store.list(agent, limit, offset).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&memories)
                .unwrap_or_else(|_| "[]".to_string())
        );
        return Ok(());
    }

    if memories.is_empty() {
        println!("no memories");
        return Ok(());
    }
    for memory in &memories {
        println!(
            "{}  [{}]  imp={:.2}  {}",
            memory.id,
            memory.category.as_str(),
            memory.importance,
            truncate(&memory.text, 80)
        );
    }
    println!("({} shown)", memories.len());
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate("short", 80), "short");
    }

    #[test]
    fn truncate_cuts_on_char_boundaries() {
        let long = "ü".repeat(100);
        let cut = truncate(&long, 10);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 10);
    }
}
