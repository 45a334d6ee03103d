// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The attention gate: a cheap heuristic filter that rejects low-substance
//! text before it costs an embedding call.

/// Minimum character length for auto-captured text.
const MIN_LENGTH: usize = 20;

/// Minimum word count for auto-captured text.
const MIN_WORDS: usize = 4;

/// Openers that mark a question or offer rather than a statement worth
/// remembering.
const QUESTION_OPENERS: &[&str] = &[
    "want me to",
    "should i",
    "shall i",
    "do you want",
    "would you like",
    "can i",
    "could you",
    "can you",
];

/// Pure acknowledgements and greetings.
const FILLER: &[&str] = &[
    "ok", "okay", "sure", "yes", "no", "yep", "nope", "thanks", "thank you", "got it",
    "sounds good", "hi", "hello", "hey", "good morning", "good night", "bye", "goodbye",
];

/// Decide whether a piece of conversation text is worth capturing.
pub fn should_capture(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < MIN_LENGTH {
        return false;
    }
    if trimmed.split_whitespace().count() < MIN_WORDS {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    if FILLER.contains(&lowered.trim_end_matches(['.', '!', '?'])) {
        return false;
    }
    if QUESTION_OPENERS.iter().any(|opener| lowered.starts_with(opener)) {
        return false;
    }
    // Questions in general are requests, not facts.
    if trimmed.ends_with('?') {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facts_pass() {
        assert!(should_capture("I decided to switch the project to Neo4j"));
        assert!(should_capture("My sister Alice lives in Berlin with her husband"));
    }

    #[test]
    fn short_and_filler_text_is_rejected() {
        assert!(!should_capture("ok"));
        assert!(!should_capture("thanks!"));
        assert!(!should_capture("sounds good"));
    }

    #[test]
    fn offers_and_questions_are_rejected() {
        assert!(!should_capture("Want me to refactor that module for you?"));
        assert!(!should_capture("should i deploy this to production now"));
        assert!(!should_capture("What time does the meeting start tomorrow?"));
    }
}
