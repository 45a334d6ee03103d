// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag orphan and single-use cleanup queries.

use noctis_core::NoctisError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Tags with zero taggings: (id, name).
pub async fn find_orphan_tags(db: &Database) -> Result<Vec<(String, String)>, NoctisError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name FROM tags \
                 WHERE id NOT IN (SELECT DISTINCT tag_id FROM tagged)",
            )?;
            let mut tags = Vec::new();
            for row in stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))? {
                tags.push(row?);
            }
            Ok(tags)
        })
        .await
        .map_err(map_tr_err)
}

/// Tags used exactly once and older than `min_age_days`: (id, name).
pub async fn find_stale_single_use_tags(
    db: &Database,
    min_age_days: f64,
) -> Result<Vec<(String, String)>, NoctisError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name FROM tags t \
                 JOIN tagged g ON g.tag_id = t.id \
                 GROUP BY t.id \
                 HAVING COUNT(*) = 1 \
                    AND julianday('now') - julianday(t.created_at) > ?1",
            )?;
            let mut tags = Vec::new();
            for row in stmt.query_map(params![min_age_days], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })? {
                tags.push(row?);
            }
            Ok(tags)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete tags with zero taggings. Returns the number removed.
pub async fn delete_orphan_tags(db: &Database) -> Result<usize, NoctisError> {
    db.connection()
        .call(|conn| {
            let deleted = conn.execute(
                "DELETE FROM tags WHERE id NOT IN (SELECT DISTINCT tag_id FROM tagged)",
                [],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete tags used exactly once and older than `min_age_days`.
///
/// Single-use tags add graph noise without enabling cross-memory traversal.
pub async fn delete_stale_single_use_tags(
    db: &Database,
    min_age_days: f64,
) -> Result<usize, NoctisError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM tags WHERE id IN ( \
                    SELECT t.id FROM tags t \
                    JOIN tagged g ON g.tag_id = t.id \
                    GROUP BY t.id \
                    HAVING COUNT(*) = 1 \
                       AND julianday('now') - julianday(t.created_at) > ?1 \
                 )",
                params![min_age_days],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}
