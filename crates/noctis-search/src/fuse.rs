// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confidence-weighted reciprocal rank fusion.

use std::collections::HashMap;

/// One signal's ranked results with its fusion weight.
pub struct RankedSignal {
    pub weight: f64,
    /// (id, text, normalized score), best first.
    pub results: Vec<(String, String, f64)>,
}

/// Fuse ranked signals into one list, best first.
///
/// Textbook RRF sums `1/(k + rank)` per list. Here each term is also
/// multiplied by the signal's own normalized score and the signal's weight,
/// so a rank-1 hit at 0.99 outranks a rank-1 hit at 0.55 from an
/// equally-weighted signal. A candidate absent from a signal contributes
/// nothing for that signal.
pub fn fuse_signals(signals: &[RankedSignal], k: f64) -> Vec<(String, String, f64)> {
    let mut fused: HashMap<String, (String, f64)> = HashMap::new();
    for signal in signals {
        if signal.weight <= 0.0 {
            continue;
        }
        for (rank, (id, text, score)) in signal.results.iter().enumerate() {
            let contribution = signal.weight * score / (k + (rank + 1) as f64);
            let entry = fused
                .entry(id.clone())
                .or_insert_with(|| (text.clone(), 0.0));
            entry.1 += contribution;
        }
    }
    let mut ranked: Vec<(String, String, f64)> = fused
        .into_iter()
        .map(|(id, (text, score))| (id, text, score))
        .collect();
    ranked.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Normalize fused scores to [0, 1] by the top score, but only when the top
/// clears a minimum floor. A single weak match must not inflate to 100%.
pub fn normalize_fused_scores(results: &mut [(String, String, f64)], floor: f64) {
    let Some(top) = results.first().map(|(_, _, score)| *score) else {
        return;
    };
    if top < floor {
        return;
    }
    for (_, _, score) in results.iter_mut() {
        *score /= top;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(weight: f64, results: &[(&str, f64)]) -> RankedSignal {
        RankedSignal {
            weight,
            results: results
                .iter()
                .map(|(id, score)| (id.to_string(), format!("text-{id}"), *score))
                .collect(),
        }
    }

    #[test]
    fn candidate_in_multiple_signals_accumulates() {
        let signals = vec![
            signal(0.5, &[("a", 1.0), ("b", 0.8)]),
            signal(0.5, &[("b", 1.0), ("c", 0.6)]),
        ];
        let fused = fuse_signals(&signals, 60.0);
        // b appears in both signals; it should outrank a and c.
        assert_eq!(fused[0].0, "b");
    }

    #[test]
    fn higher_raw_score_wins_at_equal_rank_and_weight() {
        let signals = vec![
            signal(0.5, &[("strong", 0.99)]),
            signal(0.5, &[("weak", 0.55)]),
        ];
        let fused = fuse_signals(&signals, 60.0);
        assert_eq!(fused[0].0, "strong");
        assert_eq!(fused[1].0, "weak");
    }

    #[test]
    fn zero_weight_signal_is_ignored() {
        let signals = vec![
            signal(0.0, &[("graph-only", 1.0)]),
            signal(1.0, &[("vector-hit", 0.5)]),
        ];
        let fused = fuse_signals(&signals, 60.0);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].0, "vector-hit");
    }

    #[test]
    fn normalization_scales_top_to_one() {
        let mut results = vec![
            ("a".to_string(), "ta".to_string(), 0.04),
            ("b".to_string(), "tb".to_string(), 0.02),
        ];
        normalize_fused_scores(&mut results, 0.01);
        assert!((results[0].2 - 1.0).abs() < f64::EPSILON);
        assert!((results[1].2 - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn normalization_skipped_below_floor() {
        let mut results = vec![("a".to_string(), "ta".to_string(), 0.005)];
        normalize_fused_scores(&mut results, 0.01);
        assert!((results[0].2 - 0.005).abs() < f64::EPSILON);
    }
}
