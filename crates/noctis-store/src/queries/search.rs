// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The three raw search signals: vector KNN, BM25 keyword, graph traversal.

use std::collections::HashMap;

use noctis_core::NoctisError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::schema::{RELATIONSHIP_ALLOWLIST, escape_fts_query, vec_to_blob};

/// Nearest-neighbor query against the vec0 index.
///
/// Returns (id, text, cosine similarity) ordered best-first, dropping hits
/// below `min_score` inside the query. The index cannot pre-filter, so
/// agent scoping is applied after the KNN fetch; callers over-fetch to
/// compensate.
pub async fn knn(
    db: &Database,
    embedding: &[f32],
    k: usize,
    min_score: f64,
    agent_id: Option<&str>,
) -> Result<Vec<(String, String, f64)>, NoctisError> {
    let blob = vec_to_blob(embedding);
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.text, m.agent_id, (1.0 - v.distance) AS score \
                 FROM (SELECT rowid, distance FROM vec_memories \
                       WHERE embedding MATCH ?1 AND k = ?2) v \
                 JOIN memories m ON m.rowid = v.rowid \
                 WHERE (1.0 - v.distance) >= ?3 \
                 ORDER BY v.distance ASC",
            )?;
            let rows = stmt.query_map(params![blob, k as i64, min_score], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?;
            let mut results = Vec::new();
            for row in rows {
                let (id, text, agent, score) = row?;
                if let Some(filter) = &agent_id
                    && &agent != filter
                {
                    continue;
                }
                results.push((id, text, score));
            }
            Ok(results)
        })
        .await
        .map_err(map_tr_err)
}

/// BM25 keyword search over memory text.
///
/// Scores are min-max normalized within the result set with a floor, so the
/// weakest of several matches is not driven to near-zero. A single result
/// scores a fixed 0.5: one hit proves nothing about separation from
/// non-matches.
pub async fn bm25_search(
    db: &Database,
    query: &str,
    limit: usize,
    floor: f64,
    agent_id: Option<&str>,
) -> Result<Vec<(String, String, f64)>, NoctisError> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }
    let agent_id = agent_id.map(str::to_string);
    let raw = db
        .connection()
        .call(move |conn| {
            let mut results = Vec::new();
            match &agent_id {
                Some(agent) => {
                    let mut stmt = conn.prepare(
                        "SELECT m.id, m.text, -bm25(memories_fts) AS score \
                         FROM memories_fts JOIN memories m ON m.rowid = memories_fts.rowid \
                         WHERE memories_fts MATCH ?1 AND m.agent_id = ?3 \
                         ORDER BY bm25(memories_fts) LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![escaped, limit as i64, agent], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, f64>(2)?,
                        ))
                    })?;
                    for row in rows {
                        results.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT m.id, m.text, -bm25(memories_fts) AS score \
                         FROM memories_fts JOIN memories m ON m.rowid = memories_fts.rowid \
                         WHERE memories_fts MATCH ?1 \
                         ORDER BY bm25(memories_fts) LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![escaped, limit as i64], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, f64>(2)?,
                        ))
                    })?;
                    for row in rows {
                        results.push(row?);
                    }
                }
            }
            Ok(results)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(normalize_keyword_scores(raw, floor))
}

/// Min-max normalize keyword scores into [floor, 1.0].
///
/// A single result returns a fixed moderate 0.5 rather than 1.0.
pub fn normalize_keyword_scores(
    mut results: Vec<(String, String, f64)>,
    floor: f64,
) -> Vec<(String, String, f64)> {
    match results.len() {
        0 => results,
        1 => {
            results[0].2 = 0.5;
            results
        }
        _ => {
            let max = results
                .iter()
                .map(|r| r.2)
                .fold(f64::NEG_INFINITY, f64::max);
            let min = results.iter().map(|r| r.2).fold(f64::INFINITY, f64::min);
            let span = max - min;
            for result in &mut results {
                result.2 = if span > f64::EPSILON {
                    floor + (result.2 - min) / span * (1.0 - floor)
                } else {
                    0.5
                };
            }
            results
        }
    }
}

/// Graph signal: entity fulltext match, then relationship-weighted spreading
/// activation over MENTIONS and allowlisted entity links.
///
/// A path's contribution decays multiplicatively by each edge's confidence;
/// a memory reachable along several paths keeps its maximum score.
pub async fn graph_search(
    db: &Database,
    query: &str,
    limit: usize,
    hops: u32,
    agent_id: Option<&str>,
) -> Result<Vec<(String, String, f64)>, NoctisError> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }
    let agent_id = agent_id.map(str::to_string);
    let hops = hops.clamp(1, 3);

    // rel_type values come from the compile-time allowlist, never from input.
    let type_list = RELATIONSHIP_ALLOWLIST
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(", ");

    db.connection()
        .call(move |conn| {
            // Seed entities from the fulltext index, top 5 with a normalized
            // score of at least 0.5.
            let mut raw_entities = Vec::new();
            {
                let mut stmt = conn.prepare(
                    "SELECT e.id, '' AS text, -bm25(entities_fts) AS score \
                     FROM entities_fts JOIN entities e ON e.rowid = entities_fts.rowid \
                     WHERE entities_fts MATCH ?1 \
                     ORDER BY bm25(entities_fts) LIMIT 10",
                )?;
                let rows = stmt.query_map(params![escaped], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                    ))
                })?;
                for row in rows {
                    raw_entities.push(row?);
                }
            }
            let seeds: Vec<(String, f64)> = normalize_keyword_scores(raw_entities, 0.3)
                .into_iter()
                .filter(|(_, _, score)| *score >= 0.5)
                .take(5)
                .map(|(id, _, score)| (id, score))
                .collect();
            if seeds.is_empty() {
                return Ok(Vec::new());
            }

            // memory id -> (text, max activation)
            let mut memory_scores: HashMap<String, (String, f64)> = HashMap::new();
            // entity id -> best activation seen
            let mut entity_activation: HashMap<String, f64> = seeds.iter().cloned().collect();
            let mut frontier: Vec<(String, f64)> = seeds;

            let mut mention_stmt = conn.prepare(
                "SELECT m.id, m.text, m.agent_id, mn.confidence \
                 FROM mentions mn JOIN memories m ON m.id = mn.memory_id \
                 WHERE mn.entity_id = ?1",
            )?;
            let link_sql = format!(
                "SELECT CASE WHEN from_entity = ?1 THEN to_entity ELSE from_entity END, \
                        confidence \
                 FROM entity_links \
                 WHERE (from_entity = ?1 OR to_entity = ?1) AND rel_type IN ({type_list})"
            );
            let mut link_stmt = conn.prepare(&link_sql)?;

            for hop in 0..hops {
                let mut next_frontier: Vec<(String, f64)> = Vec::new();
                for (entity_id, activation) in &frontier {
                    let rows = mention_stmt.query_map(params![entity_id], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, f64>(3)?,
                        ))
                    })?;
                    for row in rows {
                        let (memory_id, text, agent, confidence) = row?;
                        if let Some(filter) = &agent_id
                            && &agent != filter
                        {
                            continue;
                        }
                        let score = activation * confidence;
                        let entry = memory_scores
                            .entry(memory_id)
                            .or_insert_with(|| (text, 0.0));
                        if score > entry.1 {
                            entry.1 = score;
                        }
                    }

                    if hop + 1 < hops {
                        let links = link_stmt.query_map(params![entity_id], |row| {
                            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                        })?;
                        for link in links {
                            let (neighbor, confidence) = link?;
                            let spread = activation * confidence;
                            if spread < 0.05 {
                                continue;
                            }
                            let best = entity_activation.entry(neighbor.clone()).or_insert(0.0);
                            if spread > *best {
                                *best = spread;
                                next_frontier.push((neighbor, spread));
                            }
                        }
                    }
                }
                frontier = next_frontier;
                if frontier.is_empty() {
                    break;
                }
            }

            let mut results: Vec<(String, String, f64)> = memory_scores
                .into_iter()
                .map(|(id, (text, score))| (id, text, score))
                .collect();
            results.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
            results.truncate(limit);
            Ok(results)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, score: f64) -> (String, String, f64) {
        (id.to_string(), String::new(), score)
    }

    #[test]
    fn single_keyword_result_scores_half() {
        let results = normalize_keyword_scores(vec![entry("a", 12.7)], 0.3);
        assert_eq!(results.len(), 1);
        assert!((results[0].2 - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn multi_result_normalization_spans_floor_to_one() {
        let results = normalize_keyword_scores(
            vec![entry("a", 9.0), entry("b", 5.0), entry("c", 1.0)],
            0.3,
        );
        assert!((results[0].2 - 1.0).abs() < 1e-9, "top score must be 1.0");
        assert!(
            (results[2].2 - 0.3).abs() < 1e-9,
            "bottom score must be the floor"
        );
        assert!(results[1].2 > 0.3 && results[1].2 < 1.0);
    }

    #[test]
    fn equal_scores_collapse_to_half() {
        let results = normalize_keyword_scores(vec![entry("a", 4.0), entry("b", 4.0)], 0.3);
        assert!(results.iter().all(|r| (r.2 - 0.5).abs() < f64::EPSILON));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(normalize_keyword_scores(Vec::new(), 0.3).is_empty());
    }
}
