// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phase counters for one sleep-cycle run.

/// Summary of one sleep-cycle run. Counters only advance in the phases
/// that actually ran; an aborted run reports partial progress.
#[derive(Debug, Clone, Default)]
pub struct SleepReport {
    // Phase 1: vector dedup
    pub clusters_found: usize,
    pub clusters_merged: usize,
    pub memories_merged: usize,

    // Phase 2: semantic dedup
    pub semantic_pairs_checked: usize,
    pub semantic_invalidated: usize,

    // Phase 3: conflict detection
    pub conflicts_checked: usize,
    pub conflicts_invalidated: usize,

    // Phase 4: entity dedup
    pub mention_counts_reconciled: usize,
    pub entities_merged: usize,

    // Phase 5: extraction
    pub extraction_processed: usize,
    pub extraction_succeeded: usize,
    pub extraction_failed: usize,

    // Phase 6: decay
    pub memories_pruned: usize,

    // Phase 7: orphan cleanup
    pub orphan_entities_removed: usize,
    pub orphan_tags_removed: usize,
    pub stale_tags_removed: usize,

    // Phase 8: noise cleanup
    pub noise_removed: usize,

    // Phase 9: credential scan
    pub credentials_removed: usize,

    // Phase 10: task ledger (optional)
    pub tasks_archived: usize,

    /// Phases that failed; each entry is "phase: error". Failures never
    /// stop the run.
    pub phase_errors: Vec<String>,

    pub aborted: bool,
    pub duration_ms: u64,
}

impl SleepReport {
    /// One-line human summary for logs and CLI output.
    pub fn summary(&self) -> String {
        format!(
            "merged {} memories in {} clusters, invalidated {} semantic + {} conflict, \
             merged {} entities, extracted {}/{}, pruned {}, cleaned {} orphan entities / \
             {} orphan tags / {} stale tags / {} noise / {} credentials, archived {} tasks, \
             {} phase errors{} ({} ms)",
            self.memories_merged,
            self.clusters_merged,
            self.semantic_invalidated,
            self.conflicts_invalidated,
            self.entities_merged,
            self.extraction_succeeded,
            self.extraction_processed,
            self.memories_pruned,
            self.orphan_entities_removed,
            self.orphan_tags_removed,
            self.stale_tags_removed,
            self.noise_removed,
            self.credentials_removed,
            self.tasks_archived,
            self.phase_errors.len(),
            if self.aborted { ", aborted" } else { "" },
            self.duration_ms,
        )
    }
}
