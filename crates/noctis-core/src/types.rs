// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the Noctis memory engine.

use serde::{Deserialize, Serialize};

/// Importance assigned to invalidated memories (soft-delete).
///
/// Conflict and semantic-dedup losers are not deleted outright; their
/// importance is forced to this floor so the decay phase prunes them later.
pub const INVALIDATED_IMPORTANCE: f64 = 0.01;

/// Default importance for memories stored without an explicit value.
pub const DEFAULT_IMPORTANCE: f64 = 0.7;

/// A single long-term memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID identifier.
    pub id: String,
    /// The memory content.
    pub text: String,
    /// Embedding vector (fixed dimension per deployment).
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Importance in [0, 1]. Locked to 1.0 for core memories.
    pub importance: f64,
    /// Memory category.
    pub category: MemoryCategory,
    /// How this memory was created.
    pub source: MemorySource,
    /// Entity/relationship extraction progress.
    pub extraction_status: ExtractionStatus,
    /// Number of failed extraction attempts.
    pub extraction_retries: i64,
    /// Owning agent (tenant scope).
    pub agent_id: String,
    /// Session the memory was captured in, if any.
    pub session_key: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
    /// Times this memory was returned by recall.
    pub retrieval_count: i64,
    /// ISO 8601 timestamp of the last recall, if ever recalled.
    pub last_retrieved_at: Option<String>,
}

/// Category of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    /// User-curated, decay-exempt, importance locked at 1.0.
    Core,
    Preference,
    Fact,
    Decision,
    Entity,
    Other,
}

impl MemoryCategory {
    /// Convert to string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Core => "core",
            MemoryCategory::Preference => "preference",
            MemoryCategory::Fact => "fact",
            MemoryCategory::Decision => "decision",
            MemoryCategory::Entity => "entity",
            MemoryCategory::Other => "other",
        }
    }

    /// Parse from a stored string. Unknown values fall back to `Other`.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "core" => MemoryCategory::Core,
            "preference" => MemoryCategory::Preference,
            "fact" => MemoryCategory::Fact,
            "decision" => MemoryCategory::Decision,
            "entity" => MemoryCategory::Entity,
            _ => MemoryCategory::Other,
        }
    }
}

/// How a memory was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemorySource {
    /// User explicitly stored it (tool call or CLI).
    User,
    /// Captured automatically from a user conversation turn.
    AutoCapture,
    /// Captured automatically from an assistant turn.
    AutoCaptureAssistant,
    /// Produced by the file-watching collaborator.
    MemoryWatcher,
    /// Bulk import.
    Import,
}

impl MemorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::User => "user",
            MemorySource::AutoCapture => "auto-capture",
            MemorySource::AutoCaptureAssistant => "auto-capture-assistant",
            MemorySource::MemoryWatcher => "memory-watcher",
            MemorySource::Import => "import",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "auto-capture" => MemorySource::AutoCapture,
            "auto-capture-assistant" => MemorySource::AutoCaptureAssistant,
            "memory-watcher" => MemorySource::MemoryWatcher,
            "import" => MemorySource::Import,
            _ => MemorySource::User,
        }
    }
}

/// Progress of structure extraction for a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Pending,
    Complete,
    Failed,
    Skipped,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::Complete => "complete",
            ExtractionStatus::Failed => "failed",
            ExtractionStatus::Skipped => "skipped",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "complete" => ExtractionStatus::Complete,
            "failed" => ExtractionStatus::Failed,
            "skipped" => ExtractionStatus::Skipped,
            _ => ExtractionStatus::Pending,
        }
    }
}

/// An entity node in the memory graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    /// Canonical name: lowercased, trimmed, unique.
    pub name: String,
    pub kind: EntityKind,
    /// Alternative surface forms seen for this entity.
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub first_seen: String,
    pub last_seen: String,
    /// Must equal the count of incoming MENTIONS edges; a reconciliation
    /// operation exists because counter drift is possible on crash.
    pub mention_count: i64,
}

/// Type of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
    Location,
    Event,
    Concept,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Organization => "organization",
            EntityKind::Location => "location",
            EntityKind::Event => "event",
            EntityKind::Concept => "concept",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "person" => EntityKind::Person,
            "organization" => EntityKind::Organization,
            "location" => EntityKind::Location,
            "event" => EntityKind::Event,
            _ => EntityKind::Concept,
        }
    }
}

/// A tag node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    /// Canonical (lowercased, trimmed) tag name.
    pub name: String,
    pub category: Option<String>,
}

/// A nearest-neighbor hit from similarity search.
#[derive(Debug, Clone)]
pub struct SimilarMemory {
    pub id: String,
    pub text: String,
    pub score: f64,
}

/// A memory returned by hybrid search with its fused score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    pub id: String,
    pub text: String,
    pub category: MemoryCategory,
    pub importance: f64,
    pub score: f64,
}

/// An entity produced by LLM extraction.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(default = "default_entity_kind")]
    pub kind: String,
    /// Role the entity plays in the memory (subject, object, topic, ...).
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// A relationship between two extracted entities.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedRelationship {
    pub from: String,
    pub to: String,
    /// Must be a member of the fixed relationship-type allowlist.
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// A tag produced by LLM extraction.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedTag {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_entity_kind() -> String {
    "concept".to_string()
}

fn default_confidence() -> f64 {
    0.8
}

/// Full structure extracted from one memory's text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionOutcome {
    /// Suggested category for the memory, if the LLM proposed one.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
    #[serde(default)]
    pub tags: Vec<ExtractedTag>,
}

/// LLM importance rating for a memory (1-10 scale).
#[derive(Debug, Clone, Deserialize)]
pub struct ImportanceRating {
    pub score: u8,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ImportanceRating {
    /// Normalize the 1-10 score into the [0, 1] importance range.
    pub fn as_importance(&self) -> f64 {
        (f64::from(self.score) / 10.0).clamp(0.0, 1.0)
    }
}

/// LLM verdict on whether two memories are semantic duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateVerdict {
    Duplicate,
    Unique,
}

/// LLM verdict on which of two conflicting memories to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictVerdict {
    KeepA,
    KeepB,
    /// Both are valid; no real conflict.
    Both,
    /// LLM unavailable or undecidable; resolve nothing.
    Skip,
}

/// Current UTC time as an ISO 8601 string, millisecond precision.
pub fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip() {
        for cat in [
            MemoryCategory::Core,
            MemoryCategory::Preference,
            MemoryCategory::Fact,
            MemoryCategory::Decision,
            MemoryCategory::Entity,
            MemoryCategory::Other,
        ] {
            assert_eq!(MemoryCategory::from_str_value(cat.as_str()), cat);
        }
        assert_eq!(
            MemoryCategory::from_str_value("garbage"),
            MemoryCategory::Other
        );
    }

    #[test]
    fn source_roundtrip() {
        for src in [
            MemorySource::User,
            MemorySource::AutoCapture,
            MemorySource::AutoCaptureAssistant,
            MemorySource::MemoryWatcher,
            MemorySource::Import,
        ] {
            assert_eq!(MemorySource::from_str_value(src.as_str()), src);
        }
    }

    #[test]
    fn extraction_status_roundtrip() {
        for st in [
            ExtractionStatus::Pending,
            ExtractionStatus::Complete,
            ExtractionStatus::Failed,
            ExtractionStatus::Skipped,
        ] {
            assert_eq!(ExtractionStatus::from_str_value(st.as_str()), st);
        }
    }

    #[test]
    fn importance_rating_normalizes() {
        let rating = ImportanceRating {
            score: 7,
            reason: None,
        };
        assert!((rating.as_importance() - 0.7).abs() < f64::EPSILON);

        let maxed = ImportanceRating {
            score: 15,
            reason: None,
        };
        assert!((maxed.as_importance() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extraction_outcome_parses_with_defaults() {
        let json = r#"{"entities": [{"name": "Neo4j"}]}"#;
        let outcome: ExtractionOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].kind, "concept");
        assert!(outcome.relationships.is_empty());
        assert!(outcome.category.is_none());
    }

    #[test]
    fn relationship_parses_type_field() {
        let json = r#"{"from": "john", "to": "acme", "type": "WORKS_AT", "confidence": 0.9}"#;
        let rel: ExtractedRelationship = serde_json::from_str(json).unwrap();
        assert_eq!(rel.rel_type, "WORKS_AT");
    }
}
