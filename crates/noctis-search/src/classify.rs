// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query classification and adaptive signal weighting.

/// How a query should weight the three search signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Two words or fewer; keyword search carries the most signal.
    Short,
    /// Mentions a likely proper noun or asks a who/where/what question;
    /// the graph carries the most signal.
    Entity,
    /// Five words or more; the vector signal carries the most signal.
    Long,
    /// Everything else; balanced weights.
    Default,
}

/// Signal weights as (vector, bm25, graph).
pub type SignalWeights = (f64, f64, f64);

/// Common words whose capitalization (usually sentence-initial) says
/// nothing about being a proper noun.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "i", "is", "are", "was", "were", "do", "does", "did", "what", "who",
    "where", "when", "why", "how", "which", "my", "me", "you", "your", "we", "our", "they",
    "their", "it", "its", "this", "that", "these", "those", "and", "or", "but", "not", "to",
    "of", "in", "on", "for", "with", "about", "did", "can", "could", "should", "would",
];

fn is_stopword(word: &str) -> bool {
    let lowered = word.to_lowercase();
    STOPWORDS.contains(&lowered.as_str())
}

/// True when the query likely names an entity: a capitalized non-stopword
/// token, or a short who/where/what question.
fn looks_like_entity_query(words: &[&str]) -> bool {
    let has_proper_noun = words.iter().any(|word| {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        trimmed.chars().next().is_some_and(char::is_uppercase) && !is_stopword(trimmed)
    });
    if has_proper_noun {
        return true;
    }
    if words.len() <= 4
        && let Some(first) = words.first()
    {
        let lowered = first.to_lowercase();
        return matches!(lowered.as_str(), "who" | "where" | "what");
    }
    false
}

/// Classify a query. Entity detection runs before the length checks so a
/// two-word proper-noun query lands on `Entity`, not `Short`.
pub fn classify_query(query: &str) -> QueryType {
    let words: Vec<&str> = query.split_whitespace().collect();
    if looks_like_entity_query(&words) {
        return QueryType::Entity;
    }
    if words.len() <= 2 {
        return QueryType::Short;
    }
    if words.len() >= 5 {
        return QueryType::Long;
    }
    QueryType::Default
}

/// Map a query type to signal weights. The graph weight is zeroed when
/// graph search is unavailable (no reasoning backend configured).
pub fn signal_weights(query_type: QueryType, graph_enabled: bool) -> SignalWeights {
    let (vector, bm25, graph) = match query_type {
        QueryType::Short => (0.3, 0.5, 0.2),
        QueryType::Entity => (0.25, 0.25, 0.5),
        QueryType::Long => (0.55, 0.25, 0.2),
        QueryType::Default => (0.4, 0.3, 0.3),
    };
    if graph_enabled {
        (vector, bm25, graph)
    } else {
        (vector, bm25, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proper_noun_is_entity() {
        assert_eq!(classify_query("John"), QueryType::Entity);
        assert_eq!(classify_query("Acme Corp roadmap"), QueryType::Entity);
    }

    #[test]
    fn entity_wins_over_short() {
        // Two words, but a proper noun: must be Entity, not Short.
        assert_eq!(classify_query("John Smith"), QueryType::Entity);
    }

    #[test]
    fn short_queries() {
        assert_eq!(classify_query("ok"), QueryType::Short);
        assert_eq!(classify_query("fix bug"), QueryType::Short);
    }

    #[test]
    fn long_lowercase_query_is_long() {
        assert_eq!(
            classify_query("what is the best approach for this deployment pipeline migration"),
            QueryType::Long
        );
    }

    #[test]
    fn short_question_is_entity() {
        assert_eq!(classify_query("who is alice"), QueryType::Entity);
        assert_eq!(classify_query("where do they live"), QueryType::Entity);
    }

    #[test]
    fn middling_query_is_default() {
        assert_eq!(classify_query("notes about coffee brewing"), QueryType::Default);
    }

    #[test]
    fn sentence_initial_capital_is_not_an_entity() {
        assert_eq!(classify_query("What should we eat today"), QueryType::Long);
    }

    #[test]
    fn graph_weight_zeroed_when_disabled() {
        let (_, _, graph) = signal_weights(QueryType::Entity, false);
        assert_eq!(graph, 0.0);
        let (_, _, graph) = signal_weights(QueryType::Entity, true);
        assert!(graph > 0.0);
    }
}
