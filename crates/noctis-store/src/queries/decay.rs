// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Importance decay. The whole computation runs inside SQLite so candidate
//! selection is a single scan rather than a row-by-row round trip.

use noctis_core::{MemoryCategory, NoctisError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{DecayOptions, DecayedMemory};

/// Build the half-life CASE expression for per-category overrides.
fn half_life_case(opts: &DecayOptions) -> String {
    if opts.category_half_lives.is_empty() {
        return format!("{:.6}", opts.half_life_days);
    }
    let mut case = String::from("CASE category ");
    for (category, days) in &opts.category_half_lives {
        // Categories come from config validation, but quote defensively.
        let escaped = category.replace('\'', "''");
        case.push_str(&format!("WHEN '{escaped}' THEN {days:.6} "));
    }
    case.push_str(&format!("ELSE {:.6} END", opts.half_life_days));
    case
}

/// Memories whose decay score has fallen below the retention threshold.
///
/// decayScore = importance * exp(-ageDays / halfLife), where the half-life
/// stretches with importance and with how often the memory has been
/// retrieved. Age counts from the last retrieval, not creation, so memories
/// that are still being used stay fresh. Core memories never decay and are
/// excluded in the query itself.
pub async fn find_decay_candidates(
    db: &Database,
    opts: DecayOptions,
) -> Result<Vec<DecayedMemory>, NoctisError> {
    let case = half_life_case(&opts);
    let score_expr = format!(
        "importance * exp(-(julianday('now') - julianday(COALESCE(last_retrieved_at, created_at))) \
         / (({case}) * (1.0 + importance * ?1) * (1.0 + ln(1.0 + retrieval_count) * 0.2)))"
    );
    let mut sql = format!(
        "SELECT id, text, category, importance, {score_expr} AS decay_score \
         FROM memories WHERE category != 'core' AND {score_expr} < ?2"
    );
    if opts.agent_id.is_some() {
        sql.push_str(" AND agent_id = ?3");
    }
    sql.push_str(" ORDER BY decay_score ASC");

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let map_row = |row: &rusqlite::Row| -> Result<_, rusqlite::Error> {
                Ok(DecayedMemory {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    category: MemoryCategory::from_str_value(&row.get::<_, String>(2)?),
                    importance: row.get(3)?,
                    decay_score: row.get(4)?,
                })
            };
            let mut results = Vec::new();
            match &opts.agent_id {
                Some(agent) => {
                    for row in stmt.query_map(
                        params![opts.importance_multiplier, opts.retention_threshold, agent],
                        map_row,
                    )? {
                        results.push(row?);
                    }
                }
                None => {
                    for row in stmt.query_map(
                        params![opts.importance_multiplier, opts.retention_threshold],
                        map_row,
                    )? {
                        results.push(row?);
                    }
                }
            }
            Ok(results)
        })
        .await
        .map_err(map_tr_err)
}

/// Physically delete decayed memories and their vector rows. Mention and tag
/// edges go with them via foreign-key cascade; entity mention counts are
/// reconciled afterwards by the orphan-cleanup pass.
pub async fn purge_memories(db: &Database, ids: Vec<String>) -> Result<usize, NoctisError> {
    if ids.is_empty() {
        return Ok(0);
    }
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut deleted = 0usize;
            for id in &ids {
                tx.execute(
                    "DELETE FROM vec_memories WHERE rowid = \
                     (SELECT rowid FROM memories WHERE id = ?1)",
                    params![id],
                )?;
                deleted += tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> DecayOptions {
        DecayOptions {
            half_life_days: 30.0,
            category_half_lives: vec![("fact".into(), 60.0), ("other".into(), 14.0)],
            importance_multiplier: 2.0,
            retention_threshold: 0.1,
            agent_id: None,
        }
    }

    #[test]
    fn case_expression_covers_overrides_and_default() {
        let case = half_life_case(&opts());
        assert!(case.contains("WHEN 'fact' THEN 60.000000"));
        assert!(case.contains("WHEN 'other' THEN 14.000000"));
        assert!(case.contains("ELSE 30.000000 END"));
    }

    #[test]
    fn case_expression_without_overrides_is_a_constant() {
        let mut o = opts();
        o.category_half_lives.clear();
        assert_eq!(half_life_case(&o), "30.000000");
    }

    #[test]
    fn case_expression_escapes_quotes() {
        let mut o = opts();
        o.category_half_lives = vec![("it's".into(), 5.0)];
        assert!(half_life_case(&o).contains("WHEN 'it''s' THEN"));
    }
}
