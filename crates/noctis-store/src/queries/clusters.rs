// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duplicate-cluster detection (union-find over nearest-neighbor queries),
//! cluster merging, and conflict-candidate discovery.

use std::collections::HashMap;

use noctis_core::NoctisError;
use noctis_core::types::INVALIDATED_IMPORTANCE;
use rusqlite::params;
use tracing::warn;

use crate::database::{Database, map_tr_err};
use crate::models::{ClusterMember, ConflictCandidate, DuplicateCluster, MergeOutcome};

/// Neighbors fetched per node during cluster detection.
const NEIGHBORS_PER_NODE: usize = 8;

/// Arena-style union-find, local to one duplicate-detection call.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving.
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

/// Find connected components of near-duplicate memories.
///
/// O(N log N): one nearest-neighbor query per node plus union-find, instead
/// of N² pairwise comparisons. `max_pairs` caps the candidate pairs examined;
/// hitting the cap logs a warning and trades completeness for bounded cost.
/// Invalidated memories are excluded up front.
pub async fn find_duplicate_clusters(
    db: &Database,
    threshold: f64,
    agent_id: Option<&str>,
    return_similarities: bool,
    max_pairs: usize,
) -> Result<Vec<DuplicateCluster>, NoctisError> {
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut nodes: Vec<(i64, String, f64, Vec<u8>)> = Vec::new();
            {
                let sql = match &agent_id {
                    Some(_) => {
                        "SELECT rowid, id, importance, embedding FROM memories \
                         WHERE importance > ?1 AND agent_id = ?2 ORDER BY rowid"
                    }
                    None => {
                        "SELECT rowid, id, importance, embedding FROM memories \
                         WHERE importance > ?1 ORDER BY rowid"
                    }
                };
                let mut stmt = conn.prepare(sql)?;
                let map_row = |row: &rusqlite::Row| -> Result<_, rusqlite::Error> {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                };
                match &agent_id {
                    Some(agent) => {
                        for row in stmt.query_map(params![INVALIDATED_IMPORTANCE, agent], map_row)?
                        {
                            nodes.push(row?);
                        }
                    }
                    None => {
                        for row in stmt.query_map(params![INVALIDATED_IMPORTANCE], map_row)? {
                            nodes.push(row?);
                        }
                    }
                }
            }
            if nodes.len() < 2 {
                return Ok(Vec::new());
            }

            let index_of: HashMap<i64, usize> = nodes
                .iter()
                .enumerate()
                .map(|(i, (rowid, ..))| (*rowid, i))
                .collect();
            let mut uf = UnionFind::new(nodes.len());
            let mut similarities: Vec<(usize, usize, f64)> = Vec::new();
            let mut pairs_checked = 0usize;
            let mut truncated = false;

            let mut knn_stmt = conn.prepare(
                "SELECT rowid, (1.0 - distance) AS score FROM vec_memories \
                 WHERE embedding MATCH ?1 AND k = ?2",
            )?;
            'outer: for (i, (rowid, _, _, embedding)) in nodes.iter().enumerate() {
                let neighbors = knn_stmt.query_map(
                    params![embedding, NEIGHBORS_PER_NODE as i64],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
                )?;
                for neighbor in neighbors {
                    let (other_rowid, score) = neighbor?;
                    if other_rowid <= *rowid || score < threshold {
                        continue;
                    }
                    let Some(&j) = index_of.get(&other_rowid) else {
                        continue; // different agent or invalidated
                    };
                    if pairs_checked >= max_pairs {
                        truncated = true;
                        break 'outer;
                    }
                    pairs_checked += 1;
                    uf.union(i, j);
                    if return_similarities {
                        similarities.push((i, j, score));
                    }
                }
            }
            if truncated {
                warn!(
                    max_pairs,
                    "duplicate cluster detection hit the pair cap; results are partial"
                );
            }

            // Group members by root, keep components of size >= 2.
            let mut grouped: HashMap<usize, Vec<usize>> = HashMap::new();
            for i in 0..nodes.len() {
                grouped.entry(uf.find(i)).or_default().push(i);
            }
            let mut clusters = Vec::new();
            for (root, members) in grouped {
                if members.len() < 2 {
                    continue;
                }
                let cluster_sims = if return_similarities {
                    Some(
                        similarities
                            .iter()
                            .filter(|(a, _, _)| uf.find(*a) == root)
                            .map(|(a, b, score)| {
                                (nodes[*a].1.clone(), nodes[*b].1.clone(), *score)
                            })
                            .collect(),
                    )
                } else {
                    None
                };
                clusters.push(DuplicateCluster {
                    members: members
                        .into_iter()
                        .map(|i| ClusterMember {
                            id: nodes[i].1.clone(),
                            importance: nodes[i].2,
                        })
                        .collect(),
                    similarities: cluster_sims,
                });
            }
            Ok(clusters)
        })
        .await
        .map_err(map_tr_err)
}

/// Merge a cluster into its highest-importance member.
///
/// Re-verifies that every member still exists inside the same transaction as
/// the edge transfer and delete, closing the race window against concurrent
/// deletion. If any member is missing, nothing is merged and
/// `deleted_count == 0`.
pub async fn merge_memory_cluster(
    db: &Database,
    ids: Vec<String>,
    importances: Vec<f64>,
) -> Result<MergeOutcome, NoctisError> {
    if ids.is_empty() || ids.len() != importances.len() {
        return Err(NoctisError::Validation(
            "cluster merge requires matching non-empty id and importance lists".into(),
        ));
    }
    let survivor_idx = importances
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let survivor_id = ids[survivor_idx].clone();
    let loser_ids: Vec<String> = ids
        .iter()
        .filter(|id| **id != survivor_id)
        .cloned()
        .collect();
    if loser_ids.is_empty() {
        return Ok(MergeOutcome {
            survivor_id,
            deleted_count: 0,
        });
    }

    let all_ids = ids.clone();
    let outcome_survivor = survivor_id.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let placeholders: Vec<String> = (1..=all_ids.len()).map(|i| format!("?{i}")).collect();
            let present: i64 = {
                let sql = format!(
                    "SELECT COUNT(*) FROM memories WHERE id IN ({})",
                    placeholders.join(", ")
                );
                let params_vec: Vec<&dyn rusqlite::types::ToSql> = all_ids
                    .iter()
                    .map(|id| id as &dyn rusqlite::types::ToSql)
                    .collect();
                tx.query_row(&sql, params_vec.as_slice(), |row| row.get(0))?
            };
            if present as usize != all_ids.len() {
                tx.commit()?;
                return Ok(MergeOutcome {
                    survivor_id: outcome_survivor,
                    deleted_count: 0,
                });
            }

            let mut deleted = 0usize;
            for loser in &loser_ids {
                // Affected entities before edges move.
                let affected: Vec<String> = {
                    let mut stmt = tx.prepare(
                        "SELECT DISTINCT entity_id FROM mentions WHERE memory_id = ?1",
                    )?;
                    let rows = stmt.query_map(params![loser], |row| row.get::<_, String>(0))?;
                    rows.collect::<Result<_, _>>()?
                };
                tx.execute(
                    "INSERT OR IGNORE INTO mentions (memory_id, entity_id, role, confidence) \
                     SELECT ?1, entity_id, role, confidence FROM mentions WHERE memory_id = ?2",
                    params![outcome_survivor, loser],
                )?;
                tx.execute(
                    "INSERT OR IGNORE INTO tagged (memory_id, tag_id, confidence) \
                     SELECT ?1, tag_id, confidence FROM tagged WHERE memory_id = ?2",
                    params![outcome_survivor, loser],
                )?;
                tx.execute(
                    "DELETE FROM vec_memories WHERE rowid = \
                     (SELECT rowid FROM memories WHERE id = ?1)",
                    params![loser],
                )?;
                deleted += tx.execute("DELETE FROM memories WHERE id = ?1", params![loser])?;
                // Authoritative recount for entities the loser touched.
                for entity_id in &affected {
                    tx.execute(
                        "UPDATE entities SET mention_count = \
                         (SELECT COUNT(*) FROM mentions WHERE entity_id = ?1) WHERE id = ?1",
                        params![entity_id],
                    )?;
                }
            }
            tx.commit()?;
            Ok(MergeOutcome {
                survivor_id: outcome_survivor,
                deleted_count: deleted,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Memory pairs that share at least one mentioned entity, excluding core and
/// invalidated memories. Candidates for LLM conflict resolution.
pub async fn find_conflict_candidates(
    db: &Database,
    limit: usize,
    agent_id: Option<&str>,
) -> Result<Vec<ConflictCandidate>, NoctisError> {
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut sql = String::from(
                "SELECT DISTINCT ma.id, ma.text, ma.importance, mb.id, mb.text, mb.importance \
                 FROM mentions a \
                 JOIN mentions b ON a.entity_id = b.entity_id AND a.memory_id < b.memory_id \
                 JOIN memories ma ON ma.id = a.memory_id \
                 JOIN memories mb ON mb.id = b.memory_id \
                 WHERE ma.category != 'core' AND mb.category != 'core' \
                   AND ma.importance > ?1 AND mb.importance > ?1",
            );
            if agent_id.is_some() {
                sql.push_str(" AND ma.agent_id = ?3 AND mb.agent_id = ?3");
            }
            sql.push_str(" LIMIT ?2");
            let mut stmt = conn.prepare(&sql)?;
            let map_row = |row: &rusqlite::Row| -> Result<_, rusqlite::Error> {
                Ok(ConflictCandidate {
                    a_id: row.get(0)?,
                    a_text: row.get(1)?,
                    a_importance: row.get(2)?,
                    b_id: row.get(3)?,
                    b_text: row.get(4)?,
                    b_importance: row.get(5)?,
                })
            };
            let mut results = Vec::new();
            match &agent_id {
                Some(agent) => {
                    for row in stmt.query_map(
                        params![INVALIDATED_IMPORTANCE, limit as i64, agent],
                        map_row,
                    )? {
                        results.push(row?);
                    }
                }
                None => {
                    for row in
                        stmt.query_map(params![INVALIDATED_IMPORTANCE, limit as i64], map_row)?
                    {
                        results.push(row?);
                    }
                }
            }
            Ok(results)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_find_groups_transitively() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(1, 2);
        uf.union(3, 4);
        assert_eq!(uf.find(0), uf.find(2));
        assert_eq!(uf.find(3), uf.find(4));
        assert_ne!(uf.find(0), uf.find(3));
    }

    #[test]
    fn union_find_singletons_stay_apart() {
        let mut uf = UnionFind::new(3);
        assert_ne!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(1), uf.find(2));
    }
}
