// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity upserts, the batched extraction write, dedup candidates, and
//! orphan cleanup.

use noctis_core::NoctisError;
use noctis_core::types::{Entity, EntityKind, ExtractionOutcome, now_iso};
use rusqlite::params;
use tracing::debug;
use uuid::Uuid;

use crate::database::{Database, map_tr_err};
use crate::models::EntityPair;
use crate::schema::{canonical_name, is_allowed_relationship};

fn row_to_entity(row: &rusqlite::Row) -> Result<Entity, rusqlite::Error> {
    let kind: String = row.get(2)?;
    let aliases_json: String = row.get(3)?;
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: EntityKind::from_str_value(&kind),
        aliases: serde_json::from_str(&aliases_json).unwrap_or_default(),
        description: row.get(4)?,
        first_seen: row.get(5)?,
        last_seen: row.get(6)?,
        mention_count: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
    })
}

/// Get an entity by canonical name.
pub async fn get_entity_by_name(db: &Database, name: &str) -> Result<Option<Entity>, NoctisError> {
    let name = canonical_name(name);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, aliases, description, first_seen, last_seen, \
                 mention_count FROM entities WHERE name = ?1",
            )?;
            match stmt.query_row(params![name], row_to_entity) {
                Ok(entity) => Ok(Some(entity)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Apply one memory's extraction output in a single write transaction.
///
/// Performs: entity upsert (MERGE semantics: bump mention count and
/// last-seen on match, initialize on create), MENTIONS edges, allowlisted
/// entity-to-entity links (confidence keeps the max of all assertions),
/// tag upsert + TAGGED edges, category backfill (only when the memory still
/// has the generic default), and marking extraction complete.
///
/// One transaction keeps the extraction phase consistent under concurrent
/// sleep cycles.
pub async fn apply_extraction(
    db: &Database,
    memory_id: &str,
    outcome: ExtractionOutcome,
) -> Result<(), NoctisError> {
    let memory_id = memory_id.to_string();
    let now = now_iso();

    // Reject disallowed relationship types before anything touches the
    // database. Hard boundary, not a convenience filter.
    let relationships: Vec<_> = outcome
        .relationships
        .iter()
        .filter(|rel| {
            let allowed = is_allowed_relationship(&rel.rel_type);
            if !allowed {
                debug!(rel_type = %rel.rel_type, "rejecting relationship type outside allowlist");
            }
            allowed
        })
        .cloned()
        .collect();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut upsert = tx.prepare(
                    "INSERT INTO entities (id, name, kind, aliases, description, first_seen, \
                     last_seen, mention_count) VALUES (?1, ?2, ?3, '[]', NULL, ?4, ?4, 1) \
                     ON CONFLICT(name) DO UPDATE SET \
                     mention_count = COALESCE(mention_count, 0) + 1, last_seen = ?4",
                )?;
                let mut mention = tx.prepare(
                    "INSERT OR IGNORE INTO mentions (memory_id, entity_id, role, confidence) \
                     SELECT ?1, id, ?3, ?4 FROM entities WHERE name = ?2",
                )?;
                for entity in &outcome.entities {
                    let name = canonical_name(&entity.name);
                    if name.is_empty() {
                        continue;
                    }
                    upsert.execute(params![
                        Uuid::new_v4().to_string(),
                        name,
                        EntityKind::from_str_value(&entity.kind).as_str(),
                        now,
                    ])?;
                    mention.execute(params![memory_id, name, entity.role, entity.confidence])?;
                }

                let mut link = tx.prepare(
                    "INSERT INTO entity_links (from_entity, to_entity, rel_type, confidence) \
                     SELECT a.id, b.id, ?3, ?4 FROM entities a, entities b \
                     WHERE a.name = ?1 AND b.name = ?2 \
                     ON CONFLICT(from_entity, to_entity, rel_type) DO UPDATE SET \
                     confidence = MAX(confidence, excluded.confidence)",
                )?;
                for rel in &relationships {
                    link.execute(params![
                        canonical_name(&rel.from),
                        canonical_name(&rel.to),
                        rel.rel_type,
                        rel.confidence,
                    ])?;
                }

                let mut tag_upsert = tx.prepare(
                    "INSERT INTO tags (id, name, category, created_at) VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(name) DO NOTHING",
                )?;
                let mut tag_edge = tx.prepare(
                    "INSERT OR IGNORE INTO tagged (memory_id, tag_id, confidence) \
                     SELECT ?1, id, ?3 FROM tags WHERE name = ?2",
                )?;
                for tag in &outcome.tags {
                    let name = canonical_name(&tag.name);
                    if name.is_empty() {
                        continue;
                    }
                    tag_upsert.execute(params![
                        Uuid::new_v4().to_string(),
                        name,
                        tag.category,
                        now,
                    ])?;
                    tag_edge.execute(params![memory_id, name, tag.confidence])?;
                }
            }

            // Backfill category only over the generic default.
            if let Some(category) = &outcome.category {
                tx.execute(
                    "UPDATE memories SET category = ?2, updated_at = ?3 \
                     WHERE id = ?1 AND category = 'other'",
                    params![memory_id, category, now],
                )?;
            }
            tx.execute(
                "UPDATE memories SET extraction_status = 'complete', updated_at = ?2 \
                 WHERE id = ?1",
                params![memory_id, now],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Recount mention counters from MENTIONS edges.
///
/// Counter drift is possible on crash; decisions in entity dedup must not be
/// made on stale counters, so this runs first.
pub async fn reconcile_mention_counts(db: &Database) -> Result<usize, NoctisError> {
    db.connection()
        .call(|conn| {
            let updated = conn.execute(
                "UPDATE entities SET mention_count = \
                 (SELECT COUNT(*) FROM mentions WHERE entity_id = entities.id) \
                 WHERE mention_count IS NULL OR mention_count != \
                 (SELECT COUNT(*) FROM mentions WHERE entity_id = entities.id)",
                [],
            )?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Candidate entity pairs for dedup: substring-overlapping names or an alias
/// of one matching the name of the other. Entity names are short strings, so
/// this is deliberately not vector-based.
pub async fn find_duplicate_entity_pairs(db: &Database) -> Result<Vec<EntityPair>, NoctisError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.name, COALESCE(a.mention_count, 0), a.aliases, \
                        b.id, b.name, COALESCE(b.mention_count, 0), b.aliases \
                 FROM entities a JOIN entities b ON a.rowid < b.rowid",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?;
            let mut pairs = Vec::new();
            for row in rows {
                let (a_id, a_name, a_mentions, a_aliases, b_id, b_name, b_mentions, b_aliases) =
                    row?;
                if names_overlap(&a_name, &a_aliases, &b_name, &b_aliases) {
                    pairs.push(EntityPair {
                        a_id,
                        a_name,
                        a_mentions,
                        b_id,
                        b_name,
                        b_mentions,
                    });
                }
            }
            Ok(pairs)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether two entities look like the same thing: substring containment
/// between names, or either name appearing in the other's alias list.
fn names_overlap(a_name: &str, a_aliases: &str, b_name: &str, b_aliases: &str) -> bool {
    if a_name.len() >= 3 && b_name.len() >= 3 && (a_name.contains(b_name) || b_name.contains(a_name))
    {
        return true;
    }
    let a_list: Vec<String> = serde_json::from_str(a_aliases).unwrap_or_default();
    let b_list: Vec<String> = serde_json::from_str(b_aliases).unwrap_or_default();
    a_list.iter().any(|alias| canonical_name(alias) == b_name)
        || b_list.iter().any(|alias| canonical_name(alias) == a_name)
}

/// Merge `loser` into `survivor`: transfer mentions and links, union the
/// alias lists (loser's name becomes an alias), sum mention counts, and
/// delete the loser. One transaction.
pub async fn merge_entity_pair(
    db: &Database,
    survivor_id: &str,
    loser_id: &str,
) -> Result<(), NoctisError> {
    let survivor_id = survivor_id.to_string();
    let loser_id = loser_id.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let loser: Option<(String, String)> = {
                let result = tx.query_row(
                    "SELECT name, aliases FROM entities WHERE id = ?1",
                    params![loser_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                );
                match result {
                    Ok(pair) => Some(pair),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };
            let Some((loser_name, loser_aliases)) = loser else {
                tx.commit()?;
                return Ok(());
            };

            tx.execute(
                "INSERT OR IGNORE INTO mentions (memory_id, entity_id, role, confidence) \
                 SELECT memory_id, ?1, role, confidence FROM mentions WHERE entity_id = ?2",
                params![survivor_id, loser_id],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO entity_links (from_entity, to_entity, rel_type, confidence) \
                 SELECT ?1, to_entity, rel_type, confidence FROM entity_links \
                 WHERE from_entity = ?2 AND to_entity != ?1",
                params![survivor_id, loser_id],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO entity_links (from_entity, to_entity, rel_type, confidence) \
                 SELECT from_entity, ?1, rel_type, confidence FROM entity_links \
                 WHERE to_entity = ?2 AND from_entity != ?1",
                params![survivor_id, loser_id],
            )?;

            let survivor_aliases: String = tx.query_row(
                "SELECT aliases FROM entities WHERE id = ?1",
                params![survivor_id],
                |row| row.get(0),
            )?;
            let mut aliases: Vec<String> =
                serde_json::from_str(&survivor_aliases).unwrap_or_default();
            let mut incoming: Vec<String> =
                serde_json::from_str(&loser_aliases).unwrap_or_default();
            incoming.push(loser_name);
            for alias in incoming {
                if !aliases.contains(&alias) {
                    aliases.push(alias);
                }
            }
            tx.execute(
                "UPDATE entities SET aliases = ?2, last_seen = ?3, \
                 mention_count = COALESCE(mention_count, 0) + \
                 (SELECT COALESCE(mention_count, 0) FROM entities WHERE id = ?4) \
                 WHERE id = ?1",
                params![
                    survivor_id,
                    serde_json::to_string(&aliases).unwrap_or_else(|_| "[]".into()),
                    now,
                    loser_id,
                ],
            )?;
            tx.execute("DELETE FROM entities WHERE id = ?1", params![loser_id])?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Entities with zero mentions: (id, name).
pub async fn find_orphan_entities(db: &Database) -> Result<Vec<(String, String)>, NoctisError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name FROM entities \
                 WHERE id NOT IN (SELECT DISTINCT entity_id FROM mentions)",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete entities with zero mentions. Returns the number removed.
pub async fn delete_orphan_entities(db: &Database) -> Result<usize, NoctisError> {
    db.connection()
        .call(|conn| {
            let deleted = conn.execute(
                "DELETE FROM entities \
                 WHERE id NOT IN (SELECT DISTINCT entity_id FROM mentions)",
                [],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}
