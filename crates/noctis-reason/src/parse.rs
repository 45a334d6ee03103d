// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lenient parsing of LLM responses.
//!
//! Models wrap JSON in markdown fences and prose no matter how firmly the
//! prompt forbids it. The parsers here find the JSON object inside whatever
//! came back and fall to a conservative default when even that fails.

use noctis_core::NoctisError;
use noctis_core::types::{ConflictVerdict, DuplicateVerdict, ExtractionOutcome, ImportanceRating};
use serde::Deserialize;
use tracing::{debug, warn};

/// Slice out the outermost JSON object in a response.
fn json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

fn parse_failed(op: &str, response: &str, err: impl std::fmt::Display) -> NoctisError {
    warn!(operation = op, error = %err, "failed to parse reasoning response");
    debug!(operation = op, response, "raw reasoning response");
    NoctisError::Reasoning {
        message: format!("{op} response was not valid JSON: {err}"),
        transient: false,
    }
}

pub fn parse_extraction(response: &str) -> Result<ExtractionOutcome, NoctisError> {
    let json = json_object(response)
        .ok_or_else(|| parse_failed("extract", response, "no JSON object found"))?;
    serde_json::from_str(json).map_err(|e| parse_failed("extract", response, e))
}

pub fn parse_importance(response: &str) -> Result<ImportanceRating, NoctisError> {
    let json = json_object(response)
        .ok_or_else(|| parse_failed("rate_importance", response, "no JSON object found"))?;
    let rating: ImportanceRating =
        serde_json::from_str(json).map_err(|e| parse_failed("rate_importance", response, e))?;
    if rating.score == 0 {
        return Err(parse_failed("rate_importance", response, "score 0 out of range"));
    }
    Ok(rating)
}

#[derive(Deserialize)]
struct VerdictResponse {
    verdict: String,
}

fn verdict_word(response: &str) -> Option<String> {
    let parsed: Option<VerdictResponse> =
        json_object(response).and_then(|json| serde_json::from_str(json).ok());
    match parsed {
        Some(v) => Some(v.verdict.trim().to_lowercase()),
        // Bare-word reply with no JSON wrapper.
        None => Some(response.trim().trim_matches('"').to_lowercase()),
    }
}

/// Unknown verdicts are treated as unique: never merge on a confused model.
pub fn parse_duplicate_verdict(response: &str) -> DuplicateVerdict {
    match verdict_word(response).as_deref() {
        Some("duplicate") => DuplicateVerdict::Duplicate,
        Some("unique") => DuplicateVerdict::Unique,
        other => {
            warn!(verdict = ?other, "unrecognized duplicate verdict, treating as unique");
            DuplicateVerdict::Unique
        }
    }
}

/// Unknown verdicts are treated as skip: never invalidate on a confused
/// model.
pub fn parse_conflict_verdict(response: &str) -> ConflictVerdict {
    match verdict_word(response).as_deref() {
        Some("keep_a") => ConflictVerdict::KeepA,
        Some("keep_b") => ConflictVerdict::KeepB,
        Some("both") => ConflictVerdict::Both,
        Some("skip") => ConflictVerdict::Skip,
        other => {
            warn!(verdict = ?other, "unrecognized conflict verdict, skipping");
            ConflictVerdict::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_survives_markdown_fences() {
        let response = "```json\n{\"entities\": [{\"name\": \"Alice\", \"kind\": \"person\"}], \
                        \"relationships\": [], \"tags\": []}\n```";
        let outcome = parse_extraction(response).unwrap();
        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].name, "Alice");
    }

    #[test]
    fn extraction_survives_leading_prose() {
        let response = "Here is the extraction:\n{\"entities\": [], \"relationships\": [], \
                        \"tags\": [{\"name\": \"travel\"}]}";
        let outcome = parse_extraction(response).unwrap();
        assert_eq!(outcome.tags.len(), 1);
    }

    #[test]
    fn extraction_without_json_is_an_error() {
        assert!(parse_extraction("I could not find anything.").is_err());
    }

    #[test]
    fn importance_parses_score_and_reason() {
        let rating = parse_importance("{\"score\": 8, \"reason\": \"core preference\"}").unwrap();
        assert_eq!(rating.score, 8);
        assert!((rating.as_importance() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn importance_rejects_zero_score() {
        assert!(parse_importance("{\"score\": 0}").is_err());
    }

    #[test]
    fn duplicate_verdict_parses_json_and_bare_word() {
        assert_eq!(
            parse_duplicate_verdict("{\"verdict\": \"duplicate\"}"),
            DuplicateVerdict::Duplicate
        );
        assert_eq!(parse_duplicate_verdict("unique"), DuplicateVerdict::Unique);
    }

    #[test]
    fn garbled_duplicate_verdict_defaults_to_unique() {
        assert_eq!(
            parse_duplicate_verdict("maybe? hard to say"),
            DuplicateVerdict::Unique
        );
    }

    #[test]
    fn conflict_verdicts_parse() {
        assert_eq!(
            parse_conflict_verdict("{\"verdict\": \"keep_b\"}"),
            ConflictVerdict::KeepB
        );
        assert_eq!(parse_conflict_verdict("both"), ConflictVerdict::Both);
    }

    #[test]
    fn garbled_conflict_verdict_defaults_to_skip() {
        assert_eq!(parse_conflict_verdict("42"), ConflictVerdict::Skip);
    }
}
