// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory CRUD and lifecycle mutations.

use noctis_core::NoctisError;
use noctis_core::types::{
    ExtractionStatus, INVALIDATED_IMPORTANCE, Memory, MemoryCategory, MemorySource, now_iso,
};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{MemoryDraft, PendingMemory, StoreStats};
use crate::schema::{blob_to_vec, vec_to_blob};

const MEMORY_COLUMNS: &str = "id, text, embedding, importance, category, source, \
     extraction_status, extraction_retries, agent_id, session_key, created_at, updated_at, \
     retrieval_count, last_retrieved_at";

fn row_to_memory(row: &rusqlite::Row) -> Result<Memory, rusqlite::Error> {
    let embedding_blob: Vec<u8> = row.get(2)?;
    let category: String = row.get(4)?;
    let source: String = row.get(5)?;
    let status: String = row.get(6)?;
    Ok(Memory {
        id: row.get(0)?,
        text: row.get(1)?,
        embedding: blob_to_vec(&embedding_blob),
        importance: row.get(3)?,
        category: MemoryCategory::from_str_value(&category),
        source: MemorySource::from_str_value(&source),
        extraction_status: ExtractionStatus::from_str_value(&status),
        extraction_retries: row.get(7)?,
        agent_id: row.get(8)?,
        session_key: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        retrieval_count: row.get(12)?,
        last_retrieved_at: row.get(13)?,
    })
}

/// Insert a new memory and its vector-index row in one transaction.
///
/// Retrieval counters start zeroed. Fails on a duplicate id (constraint
/// violation, all but impossible with UUIDs).
pub async fn insert_memory(db: &Database, id: String, draft: MemoryDraft) -> Result<(), NoctisError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO memories (id, text, embedding, importance, category, source, \
                 extraction_status, extraction_retries, agent_id, session_key, created_at, \
                 updated_at, retrieval_count, last_retrieved_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10, ?10, 0, NULL)",
                params![
                    id,
                    draft.text,
                    vec_to_blob(&draft.embedding),
                    draft.importance,
                    draft.category.as_str(),
                    draft.source.as_str(),
                    draft.extraction_status.as_str(),
                    draft.agent_id,
                    draft.session_key,
                    now,
                ],
            )?;
            tx.execute(
                "INSERT INTO vec_memories (rowid, embedding) \
                 SELECT rowid, ?2 FROM memories WHERE id = ?1",
                params![id, vec_to_blob(&draft.embedding)],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a memory by id.
pub async fn get_memory(db: &Database, id: &str) -> Result<Option<Memory>, NoctisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_memory) {
                Ok(memory) => Ok(Some(memory)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a memory, decrementing mention counts on connected entities and
/// removing edges and index rows in the same transaction.
///
/// When `agent_id` is given the delete is scoped to that agent, preventing
/// cross-tenant deletion. Returns whether a row was removed.
pub async fn delete_memory(
    db: &Database,
    id: &str,
    agent_id: Option<&str>,
) -> Result<bool, NoctisError> {
    let id = id.to_string();
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let rowid: Option<i64> = {
                let mut stmt = match &agent_id {
                    Some(_) => {
                        tx.prepare("SELECT rowid FROM memories WHERE id = ?1 AND agent_id = ?2")?
                    }
                    None => tx.prepare("SELECT rowid FROM memories WHERE id = ?1")?,
                };
                let result = match &agent_id {
                    Some(agent) => stmt.query_row(params![id, agent], |row| row.get(0)),
                    None => stmt.query_row(params![id], |row| row.get(0)),
                };
                match result {
                    Ok(rowid) => Some(rowid),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };
            let Some(rowid) = rowid else {
                tx.commit()?;
                return Ok(false);
            };
            tx.execute(
                "UPDATE entities SET mention_count = COALESCE(mention_count, 0) - 1 \
                 WHERE id IN (SELECT entity_id FROM mentions WHERE memory_id = ?1)",
                params![id],
            )?;
            tx.execute("DELETE FROM vec_memories WHERE rowid = ?1", params![rowid])?;
            tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// List memories, newest first, optionally scoped to an agent.
pub async fn list_memories(
    db: &Database,
    agent_id: Option<&str>,
    limit: usize,
    offset: usize,
) -> Result<Vec<Memory>, NoctisError> {
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut memories = Vec::new();
            match &agent_id {
                Some(agent) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MEMORY_COLUMNS} FROM memories WHERE agent_id = ?1 \
                         ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                    ))?;
                    let rows =
                        stmt.query_map(params![agent, limit as i64, offset as i64], row_to_memory)?;
                    for row in rows {
                        memories.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MEMORY_COLUMNS} FROM memories \
                         ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
                    ))?;
                    let rows = stmt.query_map(params![limit as i64, offset as i64], row_to_memory)?;
                    for row in rows {
                        memories.push(row?);
                    }
                }
            }
            Ok(memories)
        })
        .await
        .map_err(map_tr_err)
}

/// Core memories for session bootstrap, newest first.
pub async fn list_core_memories(
    db: &Database,
    agent_id: Option<&str>,
) -> Result<Vec<Memory>, NoctisError> {
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut memories = Vec::new();
            match &agent_id {
                Some(agent) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MEMORY_COLUMNS} FROM memories \
                         WHERE category = 'core' AND agent_id = ?1 \
                         ORDER BY created_at DESC"
                    ))?;
                    for row in stmt.query_map(params![agent], row_to_memory)? {
                        memories.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MEMORY_COLUMNS} FROM memories \
                         WHERE category = 'core' ORDER BY created_at DESC"
                    ))?;
                    for row in stmt.query_map([], row_to_memory)? {
                        memories.push(row?);
                    }
                }
            }
            Ok(memories)
        })
        .await
        .map_err(map_tr_err)
}

/// All memory texts for pattern scans: (id, text, category).
///
/// `include_core` is false for noise cleanup (core is exempt) and true for
/// credential scans (credentials must never persist regardless of category).
pub async fn list_texts(
    db: &Database,
    agent_id: Option<&str>,
    include_core: bool,
) -> Result<Vec<(String, String, MemoryCategory)>, NoctisError> {
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut sql =
                String::from("SELECT id, text, category FROM memories WHERE 1=1");
            if !include_core {
                sql.push_str(" AND category != 'core'");
            }
            if agent_id.is_some() {
                sql.push_str(" AND agent_id = ?1");
            }
            let mut stmt = conn.prepare(&sql)?;
            let map_row = |row: &rusqlite::Row| -> Result<_, rusqlite::Error> {
                let category: String = row.get(2)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    MemoryCategory::from_str_value(&category),
                ))
            };
            let mut results = Vec::new();
            match &agent_id {
                Some(agent) => {
                    for row in stmt.query_map(params![agent], map_row)? {
                        results.push(row?);
                    }
                }
                None => {
                    for row in stmt.query_map([], map_row)? {
                        results.push(row?);
                    }
                }
            }
            Ok(results)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a retrieval event for a set of memories: bump the counter and the
/// recall timestamp, which also resets the decay clock.
pub async fn record_retrieval(db: &Database, ids: Vec<String>) -> Result<(), NoctisError> {
    if ids.is_empty() {
        return Ok(());
    }
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "UPDATE memories SET retrieval_count = retrieval_count + 1, \
                     last_retrieved_at = ?2 WHERE id = ?1",
                )?;
                for id in &ids {
                    stmt.execute(params![id, now])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete: force importance to the invalidation floor. The decay phase
/// performs the eventual physical removal.
pub async fn invalidate_memory(db: &Database, id: &str) -> Result<(), NoctisError> {
    let id = id.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE memories SET importance = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, INVALIDATED_IMPORTANCE, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Memories awaiting extraction, oldest first.
pub async fn find_pending_extraction(
    db: &Database,
    limit: usize,
    agent_id: Option<&str>,
) -> Result<Vec<PendingMemory>, NoctisError> {
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut results = Vec::new();
            let map_row = |row: &rusqlite::Row| -> Result<_, rusqlite::Error> {
                Ok(PendingMemory {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    extraction_retries: row.get(2)?,
                })
            };
            match &agent_id {
                Some(agent) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, text, extraction_retries FROM memories \
                         WHERE extraction_status = 'pending' AND agent_id = ?1 \
                         ORDER BY created_at ASC LIMIT ?2",
                    )?;
                    for row in stmt.query_map(params![agent, limit as i64], map_row)? {
                        results.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, text, extraction_retries FROM memories \
                         WHERE extraction_status = 'pending' \
                         ORDER BY created_at ASC LIMIT ?1",
                    )?;
                    for row in stmt.query_map(params![limit as i64], map_row)? {
                        results.push(row?);
                    }
                }
            }
            Ok(results)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an extraction attempt failed and bump the retry counter.
pub async fn mark_extraction_failed(db: &Database, id: &str) -> Result<(), NoctisError> {
    let id = id.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE memories SET extraction_status = 'failed', \
                 extraction_retries = extraction_retries + 1, updated_at = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Aggregate statistics for the `stats` surface.
pub async fn stats(db: &Database, agent_id: Option<&str>) -> Result<StoreStats, NoctisError> {
    let agent_id = agent_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let filter = match &agent_id {
                Some(_) => " WHERE agent_id = ?1",
                None => "",
            };
            let query_i64 = |conn: &rusqlite::Connection,
                             sql: &str|
             -> Result<i64, rusqlite::Error> {
                match &agent_id {
                    Some(agent) => conn.query_row(sql, params![agent], |row| row.get(0)),
                    None => conn.query_row(sql, [], |row| row.get(0)),
                }
            };
            let total =
                query_i64(conn, &format!("SELECT COUNT(*) FROM memories{filter}"))?;
            let pending = query_i64(
                conn,
                &format!(
                    "SELECT COUNT(*) FROM memories \
                     WHERE extraction_status = 'pending'{}",
                    match &agent_id {
                        Some(_) => " AND agent_id = ?1",
                        None => "",
                    }
                ),
            )?;
            let avg: f64 = match &agent_id {
                Some(agent) => conn.query_row(
                    "SELECT COALESCE(AVG(importance), 0.0) FROM memories WHERE agent_id = ?1",
                    params![agent],
                    |row| row.get(0),
                )?,
                None => conn.query_row(
                    "SELECT COALESCE(AVG(importance), 0.0) FROM memories",
                    [],
                    |row| row.get(0),
                )?,
            };
            let mut by_category = Vec::new();
            {
                let sql = format!(
                    "SELECT category, COUNT(*) FROM memories{filter} GROUP BY category \
                     ORDER BY COUNT(*) DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let map = |row: &rusqlite::Row| -> Result<(String, i64), rusqlite::Error> {
                    Ok((row.get(0)?, row.get(1)?))
                };
                match &agent_id {
                    Some(agent) => {
                        for row in stmt.query_map(params![agent], map)? {
                            by_category.push(row?);
                        }
                    }
                    None => {
                        for row in stmt.query_map([], map)? {
                            by_category.push(row?);
                        }
                    }
                }
            }
            let entity_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
            let tag_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
            Ok(StoreStats {
                total_memories: total,
                by_category,
                pending_extraction: pending,
                entity_count,
                tag_count,
                avg_importance: avg,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a memory's embedding (both the BLOB column and the vec0 row).
pub async fn update_embedding(
    db: &Database,
    id: &str,
    embedding: Vec<f32>,
) -> Result<(), NoctisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let blob = vec_to_blob(&embedding);
            tx.execute(
                "UPDATE memories SET embedding = ?2 WHERE id = ?1",
                params![id, blob],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO vec_memories (rowid, embedding) \
                 SELECT rowid, ?2 FROM memories WHERE id = ?1",
                params![id, blob],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
