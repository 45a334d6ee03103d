// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sleep cycle: a fixed-order consolidation pipeline over the memory
//! store.
//!
//! Phases run strictly sequentially. Each phase is wrapped in error
//! isolation (a failing phase is logged and the next phase runs) and checks
//! the cancellation token before starting; long inner loops check it again
//! per iteration. Cancellation never rolls back committed work.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use noctis_config::{DecayConfig, SleepConfig};
use noctis_core::NoctisError;
use noctis_core::traits::ReasoningBackend;
use noctis_core::types::{ConflictVerdict, DuplicateVerdict, INVALIDATED_IMPORTANCE};
use noctis_store::{DecayOptions, MemoryStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ledger::TaskLedger;
use crate::patterns::{find_credential, is_noise};
use crate::report::SleepReport;

/// Upper bound on conflict pairs examined per run.
const CONFLICT_CANDIDATE_LIMIT: usize = 200;

/// Per-run options, typically assembled from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct SleepOptions {
    pub agent_id: Option<String>,
    /// Skip the LLM-judged semantic-dedup phase.
    pub skip_semantic: bool,
    /// Workspace directory for the optional task-ledger phase.
    pub workspace: Option<PathBuf>,
}

pub struct SleepCycle {
    store: Arc<MemoryStore>,
    reasoner: Option<Arc<dyn ReasoningBackend>>,
    ledger: Option<Arc<dyn TaskLedger>>,
    sleep: SleepConfig,
    decay: DecayConfig,
    options: SleepOptions,
}

/// A medium-similarity pair carried from the dedup phase into semantic
/// dedup.
#[derive(Debug, Clone)]
struct CandidatePair {
    a: String,
    b: String,
    similarity: f64,
}

impl SleepCycle {
    pub fn new(
        store: Arc<MemoryStore>,
        reasoner: Option<Arc<dyn ReasoningBackend>>,
        ledger: Option<Arc<dyn TaskLedger>>,
        sleep: SleepConfig,
        decay: DecayConfig,
        options: SleepOptions,
    ) -> Self {
        Self {
            store,
            reasoner,
            ledger,
            sleep,
            decay,
            options,
        }
    }

    fn agent(&self) -> Option<&str> {
        self.options.agent_id.as_deref()
    }

    fn phase_failed(report: &mut SleepReport, phase: &str, err: NoctisError) {
        warn!(phase, error = %err, "sleep phase failed, continuing");
        report.phase_errors.push(format!("{phase}: {err}"));
    }

    /// Run the full cycle. Returns partial counters when aborted.
    pub async fn run(&self, cancel: &CancellationToken) -> SleepReport {
        let started = Instant::now();
        let mut report = SleepReport::default();
        // Loser ids from this run; later phases never act on them twice.
        let mut invalidated: HashSet<String> = HashSet::new();
        let mut medium_pairs: Vec<CandidatePair> = Vec::new();

        'phases: {
            macro_rules! phase {
                ($name:literal, $body:expr) => {
                    if cancel.is_cancelled() {
                        report.aborted = true;
                        break 'phases;
                    }
                    debug!(phase = $name, "starting sleep phase");
                    if let Err(e) = $body.await {
                        Self::phase_failed(&mut report, $name, e);
                    }
                };
            }

            phase!("dedup", self.phase_dedup(&mut report, &mut medium_pairs, cancel));
            phase!(
                "semantic_dedup",
                self.phase_semantic(&mut report, &medium_pairs, &mut invalidated, cancel)
            );
            phase!(
                "conflicts",
                self.phase_conflicts(&mut report, &mut invalidated, cancel)
            );
            phase!("entity_dedup", self.phase_entities(&mut report, cancel));
            phase!("extraction", self.phase_extraction(&mut report, cancel));
            phase!("decay", self.phase_decay(&mut report));
            phase!("orphans", self.phase_orphans(&mut report));
            phase!("noise", self.phase_noise(&mut report, cancel));
            phase!("credentials", self.phase_credentials(&mut report, cancel));
            phase!("task_ledger", self.phase_ledger(&mut report));
        }

        if cancel.is_cancelled() {
            report.aborted = true;
        }
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(aborted = report.aborted, "sleep cycle finished: {}", report.summary());
        report
    }

    /// Phase 1: one cluster fetch at the lower threshold serves both the
    /// immediate high-similarity merges and the medium band handed to
    /// semantic dedup.
    async fn phase_dedup(
        &self,
        report: &mut SleepReport,
        medium_pairs: &mut Vec<CandidatePair>,
        cancel: &CancellationToken,
    ) -> Result<(), NoctisError> {
        let clusters = self
            .store
            .duplicate_clusters(
                self.sleep.cluster_fetch_threshold,
                self.agent(),
                true,
                self.sleep.max_cluster_pairs,
            )
            .await?;
        report.clusters_found = clusters.len();

        for cluster in clusters {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let importances: HashMap<&str, f64> = cluster
                .members
                .iter()
                .map(|m| (m.id.as_str(), m.importance))
                .collect();
            let Some(similarities) = &cluster.similarities else {
                continue;
            };

            // Components connected by high-similarity edges merge now.
            let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
            for (a, b, sim) in similarities {
                if *sim >= self.sleep.dedup_threshold {
                    adjacency.entry(a).or_default().push(b);
                    adjacency.entry(b).or_default().push(a);
                }
            }
            let mut merged_away: HashSet<String> = HashSet::new();
            let mut visited: HashSet<&str> = HashSet::new();
            for member in &cluster.members {
                if visited.contains(member.id.as_str()) {
                    continue;
                }
                let mut component = Vec::new();
                let mut queue = VecDeque::from([member.id.as_str()]);
                while let Some(id) = queue.pop_front() {
                    if !visited.insert(id) {
                        continue;
                    }
                    component.push(id);
                    if let Some(neighbors) = adjacency.get(id) {
                        queue.extend(neighbors.iter().copied());
                    }
                }
                if component.len() < 2 {
                    continue;
                }
                let ids: Vec<String> = component.iter().map(|id| id.to_string()).collect();
                let comp_importances: Vec<f64> = component
                    .iter()
                    .map(|id| importances.get(id).copied().unwrap_or(0.0))
                    .collect();
                let outcome = self.store.merge_cluster(ids.clone(), comp_importances).await?;
                if outcome.deleted_count > 0 {
                    report.clusters_merged += 1;
                    report.memories_merged += outcome.deleted_count;
                    merged_away.extend(ids.into_iter().filter(|id| *id != outcome.survivor_id));
                }
            }

            // The medium band goes to the LLM phase, minus anything a merge
            // just removed.
            for (a, b, sim) in similarities {
                if *sim < self.sleep.dedup_threshold
                    && !merged_away.contains(a)
                    && !merged_away.contains(b)
                {
                    medium_pairs.push(CandidatePair {
                        a: a.clone(),
                        b: b.clone(),
                        similarity: *sim,
                    });
                }
            }
        }
        Ok(())
    }

    /// Phase 2: LLM duplicate verdicts for the medium-similarity band.
    /// Pairs below the pre-screen threshold never reach the LLM; the rest
    /// are capped, highest similarity first, and judged in concurrent
    /// batches. The lower-importance side of a duplicate is invalidated.
    async fn phase_semantic(
        &self,
        report: &mut SleepReport,
        medium_pairs: &[CandidatePair],
        invalidated: &mut HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<(), NoctisError> {
        if self.options.skip_semantic {
            debug!("semantic dedup skipped by request");
            return Ok(());
        }
        let Some(reasoner) = &self.reasoner else {
            debug!("semantic dedup skipped, no reasoning backend");
            return Ok(());
        };

        let mut pairs: Vec<&CandidatePair> = medium_pairs
            .iter()
            .filter(|p| p.similarity >= self.sleep.semantic_prescreen)
            .collect();
        pairs.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pairs.truncate(self.sleep.max_semantic_pairs);

        for chunk in pairs.chunks(self.sleep.llm_concurrency.max(1)) {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let eligible: Vec<&CandidatePair> = chunk
                .iter()
                .copied()
                .filter(|p| !invalidated.contains(&p.a) && !invalidated.contains(&p.b))
                .collect();
            let judged = join_all(eligible.iter().map(|pair| {
                let reasoner = Arc::clone(reasoner);
                async move {
                    let a = self.store.get(&pair.a).await.ok().flatten()?;
                    let b = self.store.get(&pair.b).await.ok().flatten()?;
                    if a.importance <= INVALIDATED_IMPORTANCE
                        || b.importance <= INVALIDATED_IMPORTANCE
                    {
                        return None;
                    }
                    match reasoner.judge_duplicate(&a.text, &b.text).await {
                        Ok(DuplicateVerdict::Duplicate) => {
                            let loser = if a.importance <= b.importance { a.id } else { b.id };
                            Some((true, Some(loser)))
                        }
                        Ok(DuplicateVerdict::Unique) => Some((true, None)),
                        Err(e) => {
                            warn!(error = %e, "duplicate verdict failed, skipping pair");
                            None
                        }
                    }
                }
            }))
            .await;

            for outcome in judged.into_iter().flatten() {
                let (checked, loser) = outcome;
                if checked {
                    report.semantic_pairs_checked += 1;
                }
                if let Some(loser) = loser
                    && invalidated.insert(loser.clone())
                {
                    self.store.invalidate(&loser).await?;
                    report.semantic_invalidated += 1;
                }
            }
        }
        Ok(())
    }

    /// Phase 3: conflict detection over memory pairs sharing an entity.
    async fn phase_conflicts(
        &self,
        report: &mut SleepReport,
        invalidated: &mut HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<(), NoctisError> {
        let Some(reasoner) = &self.reasoner else {
            debug!("conflict detection skipped, no reasoning backend");
            return Ok(());
        };
        let candidates = self
            .store
            .conflict_candidates(CONFLICT_CANDIDATE_LIMIT, self.agent())
            .await?;

        for chunk in candidates.chunks(self.sleep.llm_concurrency.max(1)) {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let eligible: Vec<&noctis_store::ConflictCandidate> = chunk
                .iter()
                .filter(|p| !invalidated.contains(&p.a_id) && !invalidated.contains(&p.b_id))
                .collect();
            let resolved = join_all(eligible.iter().map(|pair| {
                let reasoner = Arc::clone(reasoner);
                async move {
                    match reasoner.resolve_conflict(&pair.a_text, &pair.b_text).await {
                        Ok(verdict) => Some((pair, verdict)),
                        Err(e) => {
                            warn!(error = %e, "conflict verdict failed, skipping pair");
                            None
                        }
                    }
                }
            }))
            .await;

            for (pair, verdict) in resolved.into_iter().flatten() {
                report.conflicts_checked += 1;
                let loser = match verdict {
                    ConflictVerdict::KeepA => Some(&pair.b_id),
                    ConflictVerdict::KeepB => Some(&pair.a_id),
                    ConflictVerdict::Both | ConflictVerdict::Skip => None,
                };
                if let Some(loser) = loser
                    && invalidated.insert(loser.clone())
                {
                    self.store.invalidate(loser).await?;
                    report.conflicts_invalidated += 1;
                }
            }
        }
        Ok(())
    }

    /// Phase 4: reconcile drifted mention counts, then merge entities whose
    /// names overlap. Survivor has more mentions; ties go to the shorter
    /// name.
    async fn phase_entities(
        &self,
        report: &mut SleepReport,
        cancel: &CancellationToken,
    ) -> Result<(), NoctisError> {
        report.mention_counts_reconciled = self.store.reconcile_mention_counts().await?;

        let pairs = self.store.duplicate_entity_pairs().await?;
        for pair in pairs {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let (survivor, loser) = if pair.a_mentions > pair.b_mentions {
                (&pair.a_id, &pair.b_id)
            } else if pair.b_mentions > pair.a_mentions {
                (&pair.b_id, &pair.a_id)
            } else if pair.a_name.len() <= pair.b_name.len() {
                (&pair.a_id, &pair.b_id)
            } else {
                (&pair.b_id, &pair.a_id)
            };
            self.store.merge_entities(survivor, loser).await?;
            report.entities_merged += 1;
        }
        Ok(())
    }

    /// Phase 5: structure extraction for pending memories, in batches with
    /// bounded concurrency and an abort-interruptible delay between batches
    /// to rate-limit the LLM server.
    async fn phase_extraction(
        &self,
        report: &mut SleepReport,
        cancel: &CancellationToken,
    ) -> Result<(), NoctisError> {
        let Some(reasoner) = &self.reasoner else {
            debug!("extraction skipped, no reasoning backend");
            return Ok(());
        };
        let batch_size = self.sleep.extraction_batch_size.max(1);

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let batch = self.store.pending_extraction(batch_size, self.agent()).await?;
            if batch.is_empty() {
                return Ok(());
            }
            let batch_len = batch.len();

            for chunk in batch.chunks(self.sleep.llm_concurrency.max(1)) {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let outcomes = join_all(chunk.iter().map(|pending| {
                    let reasoner = Arc::clone(reasoner);
                    async move {
                        let extracted = reasoner.extract(&pending.text).await;
                        (pending.id.clone(), extracted)
                    }
                }))
                .await;

                for (id, extracted) in outcomes {
                    report.extraction_processed += 1;
                    let applied = match extracted {
                        Ok(outcome) => self.store.apply_extraction(&id, outcome).await,
                        Err(e) => Err(e),
                    };
                    match applied {
                        Ok(()) => report.extraction_succeeded += 1,
                        Err(e) => {
                            warn!(memory_id = %id, error = %e, "extraction failed");
                            report.extraction_failed += 1;
                            if let Err(e) = self.store.mark_extraction_failed(&id).await {
                                warn!(memory_id = %id, error = %e, "failed to mark extraction failed");
                            }
                        }
                    }
                }
            }

            if batch_len < batch_size {
                return Ok(());
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(Duration::from_millis(self.sleep.batch_delay_ms)) => {}
            }
        }
    }

    /// Phase 6: physical pruning of decayed memories. Runs after extraction
    /// so fresh memories build graph connections before becoming eligible.
    async fn phase_decay(&self, report: &mut SleepReport) -> Result<(), NoctisError> {
        let opts = DecayOptions {
            half_life_days: self.decay.half_life_days,
            category_half_lives: self
                .decay
                .category_half_lives
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            importance_multiplier: self.decay.importance_multiplier,
            retention_threshold: self.decay.retention_threshold,
            agent_id: self.options.agent_id.clone(),
        };
        let candidates = self.store.decay_candidates(opts).await?;
        if candidates.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = candidates.into_iter().map(|c| c.id).collect();
        report.memories_pruned = self.store.purge_memories(ids).await?;
        Ok(())
    }

    /// Phase 7: orphaned entities, orphaned tags, and stale single-use
    /// tags.
    async fn phase_orphans(&self, report: &mut SleepReport) -> Result<(), NoctisError> {
        report.orphan_entities_removed = self.store.delete_orphan_entities().await?;
        report.orphan_tags_removed = self.store.delete_orphan_tags().await?;
        report.stale_tags_removed = self
            .store
            .delete_stale_single_use_tags(self.sleep.single_use_tag_min_age_days)
            .await?;
        Ok(())
    }

    /// Phase 8: delete non-core memories matching the noise patterns.
    async fn phase_noise(
        &self,
        report: &mut SleepReport,
        cancel: &CancellationToken,
    ) -> Result<(), NoctisError> {
        let texts = self.store.list_texts(self.agent(), false).await?;
        for (id, text, _) in texts {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if is_noise(&text) && self.store.delete(&id, self.agent()).await? {
                debug!(memory_id = %id, "removed noise memory");
                report.noise_removed += 1;
            }
        }
        Ok(())
    }

    /// Phase 9: credential scan over every memory, core included.
    /// Credentials must never persist regardless of category.
    async fn phase_credentials(
        &self,
        report: &mut SleepReport,
        cancel: &CancellationToken,
    ) -> Result<(), NoctisError> {
        let texts = self.store.list_texts(self.agent(), true).await?;
        for (id, text, _) in texts {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if let Some(label) = find_credential(&text) {
                warn!(memory_id = %id, pattern = label, "credential-shaped memory removed");
                if self.store.delete(&id, self.agent()).await? {
                    report.credentials_removed += 1;
                }
            }
        }
        Ok(())
    }

    /// Phase 10: optional task-ledger archival, only when both a
    /// collaborator and a workspace are configured.
    async fn phase_ledger(&self, report: &mut SleepReport) -> Result<(), NoctisError> {
        let (Some(ledger), Some(workspace)) = (&self.ledger, &self.options.workspace) else {
            return Ok(());
        };
        report.tasks_archived = ledger.archive_stale(workspace).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use noctis_core::types::{
        DuplicateVerdict, ExtractionOutcome, ExtractionStatus, ImportanceRating, MemoryCategory,
        MemorySource,
    };
    use noctis_store::MemoryDraft;

    /// Reasoner that calls every medium-similarity pair a duplicate and
    /// otherwise stays out of the way.
    struct AgreeableReasoner;

    #[async_trait]
    impl ReasoningBackend for AgreeableReasoner {
        async fn extract(&self, _text: &str) -> Result<ExtractionOutcome, NoctisError> {
            Ok(ExtractionOutcome::default())
        }

        async fn rate_importance(&self, _text: &str) -> Result<ImportanceRating, NoctisError> {
            Ok(ImportanceRating {
                score: 7,
                reason: None,
            })
        }

        async fn judge_duplicate(
            &self,
            _a: &str,
            _b: &str,
        ) -> Result<DuplicateVerdict, NoctisError> {
            Ok(DuplicateVerdict::Duplicate)
        }

        async fn resolve_conflict(
            &self,
            _a: &str,
            _b: &str,
        ) -> Result<ConflictVerdict, NoctisError> {
            Ok(ConflictVerdict::Skip)
        }
    }

    fn draft(text: &str, embedding: Vec<f32>, importance: f64) -> MemoryDraft {
        MemoryDraft {
            text: text.into(),
            embedding,
            importance,
            category: MemoryCategory::Fact,
            source: MemorySource::User,
            agent_id: "default".into(),
            session_key: None,
            extraction_status: ExtractionStatus::Skipped,
        }
    }

    fn cycle(store: Arc<MemoryStore>, reasoner: Option<Arc<dyn ReasoningBackend>>) -> SleepCycle {
        SleepCycle::new(
            store,
            reasoner,
            None,
            SleepConfig::default(),
            DecayConfig::default(),
            SleepOptions::default(),
        )
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_any_phase() {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        store
            .store_memory(draft("should I continue?", vec![0.1; 4], 0.7))
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = cycle(Arc::clone(&store), None).run(&cancel).await;
        assert!(report.aborted);
        assert_eq!(report.noise_removed, 0);
        assert_eq!(report.memories_pruned, 0);
        // The noise memory must still be there.
        assert_eq!(store.list(None, 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn high_similarity_duplicates_merge_to_highest_importance() {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        store
            .store_memory(draft("likes espresso", vec![1.0, 0.0, 0.0, 0.0], 0.4))
            .await
            .unwrap();
        let keeper = store
            .store_memory(draft("loves espresso", vec![1.0, 0.0, 0.0, 0.0], 0.9))
            .await
            .unwrap();

        let report = cycle(Arc::clone(&store), None)
            .run(&CancellationToken::new())
            .await;
        assert_eq!(report.memories_merged, 1);
        assert_eq!(report.clusters_merged, 1);
        let remaining = store.list(None, 10, 0).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keeper);
    }

    #[tokio::test]
    async fn medium_band_pair_goes_through_llm_and_loser_is_pruned() {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        // cosine similarity between these is 0.9: inside the medium band.
        let keeper = store
            .store_memory(draft("lives in Lisbon", vec![1.0, 0.0, 0.0, 0.0], 0.9))
            .await
            .unwrap();
        store
            .store_memory(draft(
                "based in Lisbon",
                vec![0.9, 0.435_889_9, 0.0, 0.0],
                0.5,
            ))
            .await
            .unwrap();

        let reasoner: Arc<dyn ReasoningBackend> = Arc::new(AgreeableReasoner);
        let report = cycle(Arc::clone(&store), Some(reasoner))
            .run(&CancellationToken::new())
            .await;
        assert_eq!(report.memories_merged, 0, "0.9 is below the merge threshold");
        assert_eq!(report.semantic_invalidated, 1);
        // The invalidated loser decays out in the same run.
        assert!(report.memories_pruned >= 1);
        let remaining = store.list(None, 10, 0).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keeper);
    }

    #[tokio::test]
    async fn skip_semantic_leaves_medium_band_alone() {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        store
            .store_memory(draft("lives in Lisbon", vec![1.0, 0.0, 0.0, 0.0], 0.9))
            .await
            .unwrap();
        store
            .store_memory(draft(
                "based in Lisbon",
                vec![0.9, 0.435_889_9, 0.0, 0.0],
                0.5,
            ))
            .await
            .unwrap();

        let reasoner: Arc<dyn ReasoningBackend> = Arc::new(AgreeableReasoner);
        let engine = SleepCycle::new(
            store.clone(),
            Some(reasoner),
            None,
            SleepConfig::default(),
            DecayConfig::default(),
            SleepOptions {
                skip_semantic: true,
                ..SleepOptions::default()
            },
        );
        let report = engine.run(&CancellationToken::new()).await;
        assert_eq!(report.semantic_invalidated, 0);
        assert_eq!(store.list(None, 10, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn noise_is_removed_and_facts_survive() {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        store
            .store_memory(draft("Want me to clean this up for you?", vec![0.2, 0.0, 0.0, 0.0], 0.7))
            .await
            .unwrap();
        store
            .store_memory(draft("user prefers dark roast", vec![0.0, 0.2, 0.0, 0.0], 0.7))
            .await
            .unwrap();

        let report = cycle(Arc::clone(&store), None)
            .run(&CancellationToken::new())
            .await;
        assert_eq!(report.noise_removed, 1);
        let remaining = store.list(None, 10, 0).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].text.contains("dark roast"));
    }

    #[tokio::test]
    async fn credential_scan_removes_core_memories_too() {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        let mut credential = draft(
            "my key is api_key_live_abcdef1234567890abcdef",
            vec![0.3, 0.0, 0.0, 0.0],
            1.0,
        );
        credential.category = MemoryCategory::Core;
        store.store_memory(credential).await.unwrap();

        let report = cycle(Arc::clone(&store), None)
            .run(&CancellationToken::new())
            .await;
        assert_eq!(report.credentials_removed, 1);
        assert!(store.list(None, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalidated_memories_are_pruned_but_core_survives() {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        let doomed = store
            .store_memory(draft("obsolete fact", vec![0.4, 0.0, 0.0, 0.0], 0.7))
            .await
            .unwrap();
        store.invalidate(&doomed).await.unwrap();
        let mut core = draft("user's name is Dana", vec![0.0, 0.4, 0.0, 0.0], 1.0);
        core.category = MemoryCategory::Core;
        let kept = store.store_memory(core).await.unwrap();

        let report = cycle(Arc::clone(&store), None)
            .run(&CancellationToken::new())
            .await;
        assert!(report.memories_pruned >= 1);
        assert!(store.get(&doomed).await.unwrap().is_none());
        assert!(store.get(&kept).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn phase_errors_never_abort_the_run() {
        // A ledger that always fails must show up in phase_errors while the
        // rest of the run completes.
        struct FailingLedger;

        #[async_trait]
        impl TaskLedger for FailingLedger {
            async fn archive_stale(&self, _workspace: &std::path::Path) -> Result<usize, NoctisError> {
                Err(NoctisError::Internal("ledger offline".into()))
            }
        }

        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        let engine = SleepCycle::new(
            store,
            None,
            Some(Arc::new(FailingLedger)),
            SleepConfig::default(),
            DecayConfig::default(),
            SleepOptions {
                workspace: Some(PathBuf::from("/tmp/nowhere")),
                ..SleepOptions::default()
            },
        );
        let report = engine.run(&CancellationToken::new()).await;
        assert!(!report.aborted);
        assert_eq!(report.phase_errors.len(), 1);
        assert!(report.phase_errors[0].starts_with("task_ledger:"));
    }
}
