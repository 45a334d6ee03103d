// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt templates for the four reasoning operations.
//!
//! Every prompt demands JSON-only output; the parser still tolerates
//! markdown fences and prose around the payload.

/// Entity, relationship, and tag extraction from one memory's text.
pub const EXTRACTION_PROMPT: &str = r#"Extract structured knowledge from this memory text. Output a single JSON object.

{
  "category": one of "core", "preference", "fact", "decision", "entity", "other",
  "entities": [{"name": "...", "kind": "person|organization|location|event|concept", "role": "subject|object|topic", "confidence": 0.0-1.0}],
  "relationships": [{"from": "entity name", "to": "entity name", "type": "WORKS_AT|LIVES_AT|KNOWS|MARRIED_TO|PREFERS|DECIDED|RELATED_TO", "confidence": 0.0-1.0}],
  "tags": [{"name": "short-lowercase-topic", "confidence": 0.0-1.0}]
}

Rules:
- Entity names are proper nouns or specific concepts, not generic words.
- Relationship "type" must be one of the seven listed values; omit relationships that fit none.
- At most 5 tags; tags are topics, not restatements of the text.
- If nothing can be extracted, return {"entities": [], "relationships": [], "tags": []}.

Memory text:
{text}

Output JSON only, no explanation:"#;

/// Long-term importance rating on a 1-10 scale.
pub const IMPORTANCE_PROMPT: &str = r#"Rate how important this memory is to remember long-term, on a 1-10 scale.

10 = identity-level fact about the user (name, family, core values)
7-9 = durable preference, decision, or life fact
4-6 = useful context that may matter again
1-3 = trivia, small talk, transient state

Output JSON only: {"score": 1-10, "reason": "one short sentence"}

Memory text:
{text}

Output JSON only, no explanation:"#;

/// Semantic duplicate judgment for a pair of memories.
pub const DUPLICATE_PROMPT: &str = r#"Do these two memories state the same fact? Paraphrases and partial overlaps that carry no new information count as duplicates. Different facts about the same subject do not.

Memory A:
{a}

Memory B:
{b}

Output JSON only: {"verdict": "duplicate"} or {"verdict": "unique"}"#;

/// Conflict resolution for a pair of memories about the same entity.
///
/// The four verdict strings are matched verbatim by
/// `parse::parse_conflict_verdict`; "skip" exists so the model can decline
/// rather than guess. Change prompt and parser together.
pub const CONFLICT_PROMPT: &str = r#"These two memories mention the same entity and may contradict each other. Decide which to keep.

- "keep_a": A is correct or more current; B is obsolete.
- "keep_b": B is correct or more current; A is obsolete.
- "both": they do not actually conflict.
- "skip": cannot tell without more context.

Memory A:
{a}

Memory B:
{b}

Output JSON only: {"verdict": "keep_a" | "keep_b" | "both" | "skip"}"#;

pub fn extraction_prompt(text: &str) -> String {
    EXTRACTION_PROMPT.replace("{text}", text)
}

pub fn importance_prompt(text: &str) -> String {
    IMPORTANCE_PROMPT.replace("{text}", text)
}

pub fn duplicate_prompt(a: &str, b: &str) -> String {
    DUPLICATE_PROMPT.replace("{a}", a).replace("{b}", b)
}

pub fn conflict_prompt(a: &str, b: &str) -> String {
    CONFLICT_PROMPT.replace("{a}", a).replace("{b}", b)
}
