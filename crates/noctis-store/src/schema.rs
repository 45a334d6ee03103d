// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema constants, the relationship-type allowlist, and query text helpers.
//!
//! The allowlist is a hard security boundary: relationship types arrive from
//! LLM extraction output and must never reach a query unchecked.

/// Allowed entity-to-entity relationship types.
///
/// Compile-time-fixed. Any type outside this list is rejected before it is
/// written or traversed.
pub const RELATIONSHIP_ALLOWLIST: &[&str] = &[
    "WORKS_AT",
    "LIVES_AT",
    "KNOWS",
    "MARRIED_TO",
    "PREFERS",
    "DECIDED",
    "RELATED_TO",
];

/// Whether a relationship type is a member of the fixed allowlist.
pub fn is_allowed_relationship(rel_type: &str) -> bool {
    RELATIONSHIP_ALLOWLIST.contains(&rel_type)
}

/// Escape free text for use as an FTS5 MATCH expression.
///
/// FTS5 treats many characters as query syntax. Wrapping each token in double
/// quotes (with embedded quotes doubled) turns the input into a plain phrase
/// conjunction and defuses injection through search strings.
pub fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonicalize an entity or tag name: trimmed and lowercased.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Check that a string is a well-formed UUID.
///
/// Free-form ids must never reach the store; this is the injection defense
/// for delete-by-id paths.
pub fn is_valid_uuid(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

/// Convert an f32 vector to little-endian bytes for BLOB storage and
/// sqlite-vec MATCH parameters.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a stored BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap_or([0; 4])))
        .collect()
}

/// Core table and trigger definitions.
///
/// The vec0 virtual table is created separately because its column definition
/// embeds the configured embedding dimension.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    importance REAL NOT NULL DEFAULT 0.7,
    category TEXT NOT NULL DEFAULT 'other',
    source TEXT NOT NULL DEFAULT 'user',
    extraction_status TEXT NOT NULL DEFAULT 'pending',
    extraction_retries INTEGER NOT NULL DEFAULT 0,
    agent_id TEXT NOT NULL DEFAULT 'default',
    session_key TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    retrieval_count INTEGER NOT NULL DEFAULT 0,
    last_retrieved_at TEXT
);

CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    text,
    content='memories',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, text) VALUES (new.rowid, new.text);
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, text)
        VALUES('delete', old.rowid, old.text);
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE OF text ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, text)
        VALUES('delete', old.rowid, old.text);
    INSERT INTO memories_fts(rowid, text) VALUES (new.rowid, new.text);
END;

CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL DEFAULT 'concept',
    aliases TEXT NOT NULL DEFAULT '[]',
    description TEXT,
    first_seen TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    last_seen TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    mention_count INTEGER DEFAULT 0
);

CREATE VIRTUAL TABLE IF NOT EXISTS entities_fts USING fts5(
    name,
    content='entities',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS entities_ai AFTER INSERT ON entities BEGIN
    INSERT INTO entities_fts(rowid, name) VALUES (new.rowid, new.name);
END;

CREATE TRIGGER IF NOT EXISTS entities_ad AFTER DELETE ON entities BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name)
        VALUES('delete', old.rowid, old.name);
END;

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    category TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS mentions (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    role TEXT,
    confidence REAL NOT NULL DEFAULT 0.8,
    PRIMARY KEY (memory_id, entity_id)
);

CREATE TABLE IF NOT EXISTS tagged (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    confidence REAL NOT NULL DEFAULT 0.8,
    PRIMARY KEY (memory_id, tag_id)
);

CREATE TABLE IF NOT EXISTS entity_links (
    from_entity TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    to_entity TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    rel_type TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 0.8,
    PRIMARY KEY (from_entity, to_entity, rel_type)
);
";

/// Secondary property indexes, applied individually and best-effort: they may
/// already exist with different settings on older databases.
pub const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_memories_agent ON memories(agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category)",
    "CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_memories_last_retrieved ON memories(last_retrieved_at)",
    "CREATE INDEX IF NOT EXISTS idx_memories_extraction ON memories(extraction_status)",
    "CREATE INDEX IF NOT EXISTS idx_mentions_entity ON mentions(entity_id)",
    "CREATE INDEX IF NOT EXISTS idx_tagged_tag ON tagged(tag_id)",
    "CREATE INDEX IF NOT EXISTS idx_links_from ON entity_links(from_entity)",
    "CREATE INDEX IF NOT EXISTS idx_links_to ON entity_links(to_entity)",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_accepts_known_types() {
        assert!(is_allowed_relationship("WORKS_AT"));
        assert!(is_allowed_relationship("RELATED_TO"));
    }

    #[test]
    fn allowlist_rejects_unknown_and_lowercase() {
        assert!(!is_allowed_relationship("OWNS"));
        assert!(!is_allowed_relationship("works_at"));
        assert!(!is_allowed_relationship("WORKS_AT; DROP TABLE memories"));
        assert!(!is_allowed_relationship(""));
    }

    #[test]
    fn escape_fts_quotes_tokens() {
        assert_eq!(escape_fts_query("hello world"), "\"hello\" \"world\"");
        assert_eq!(escape_fts_query("a\"b"), "\"a\"\"b\"");
        assert_eq!(escape_fts_query("NEAR(x)"), "\"NEAR(x)\"");
    }

    #[test]
    fn canonical_name_normalizes() {
        assert_eq!(canonical_name("  John Smith "), "john smith");
    }

    #[test]
    fn uuid_validation() {
        assert!(is_valid_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_uuid("not-a-uuid"));
        assert!(!is_valid_uuid("1 OR 1=1"));
    }

    #[test]
    fn blob_roundtrip() {
        let original = vec![0.25_f32, -1.5, 3.75];
        let blob = vec_to_blob(&original);
        assert_eq!(blob.len(), 12);
        assert_eq!(blob_to_vec(&blob), original);
    }
}
