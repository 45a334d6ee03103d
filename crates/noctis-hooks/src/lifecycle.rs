// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host lifecycle bindings: bootstrap injection, auto-recall, auto-capture,
//! and the auto-sleep trigger.
//!
//! The host serializes hook invocations per session. Capture, sleep, and
//! retrieval recording are fire-and-forget; the hook path never awaits
//! them.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use noctis_config::NoctisConfig;
use noctis_core::traits::{EmbeddingBackend, ReasoningBackend};
use noctis_core::types::{Memory, MemorySource};
use noctis_search::HybridSearch;
use noctis_sleep::{SleepCycle, SleepOptions, TaskLedger};
use noctis_store::MemoryStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gate::should_capture;
use crate::session::SessionTracker;
use crate::tools::MemoryTools;

/// A file-shaped context blob injected into the agent's working set.
#[derive(Debug, Clone)]
pub struct VirtualFile {
    pub path: String,
    pub content: String,
}

pub struct MemoryHooks {
    store: Arc<MemoryStore>,
    reasoner: Option<Arc<dyn ReasoningBackend>>,
    ledger: Option<Arc<dyn TaskLedger>>,
    search: Arc<HybridSearch>,
    tools: Arc<MemoryTools>,
    sessions: SessionTracker,
    config: NoctisConfig,
    agent_id: String,
    sleep_running: Arc<AtomicBool>,
    last_sleep: Arc<Mutex<Option<Instant>>>,
}

impl MemoryHooks {
    pub fn new(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        reasoner: Option<Arc<dyn ReasoningBackend>>,
        ledger: Option<Arc<dyn TaskLedger>>,
        config: NoctisConfig,
    ) -> Self {
        // Graph traversal only pays off once extraction has populated the
        // entity graph, which requires a reasoning backend.
        let search = Arc::new(HybridSearch::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            config.search.clone(),
            reasoner.is_some(),
        ));
        let tools = Arc::new(MemoryTools::new(
            Arc::clone(&store),
            embedder,
            reasoner.clone(),
            Arc::clone(&search),
            &config,
        ));
        let sessions = SessionTracker::new(
            Duration::from_secs(config.hooks.session_ttl_hours * 3600),
            Duration::from_secs(config.hooks.sweep_interval_minutes * 60),
        );
        let agent_id = config.agent.agent_id.clone();
        Self {
            store,
            reasoner,
            ledger,
            search,
            tools,
            sessions,
            config,
            agent_id,
            sleep_running: Arc::new(AtomicBool::new(false)),
            last_sleep: Arc::new(Mutex::new(None)),
        }
    }

    /// The tool-call surface, for hosts that register tools separately
    /// from lifecycle events.
    pub fn tools(&self) -> Arc<MemoryTools> {
        Arc::clone(&self.tools)
    }

    /// Session start: inject all core memories as a virtual file and mark
    /// the session bootstrapped. Returns `None` when there is nothing to
    /// inject or the store is unreachable.
    pub async fn agent_bootstrap(&self, session_key: &str) -> Option<VirtualFile> {
        let core = match self.store.core_memories(Some(&self.agent_id)).await {
            Ok(core) => core,
            Err(e) => {
                warn!(error = %e, "core memory bootstrap failed");
                return None;
            }
        };
        self.sessions.with_session(session_key, |state| {
            state.bootstrapped = true;
            state.injected_core_ids = core.iter().map(|m| m.id.clone()).collect();
        });
        if core.is_empty() {
            return None;
        }
        info!(count = core.len(), "injecting core memories");
        Some(VirtualFile {
            path: "memory/core.md".to_string(),
            content: render_core(&core),
        })
    }

    /// Before each agent turn: recall memories relevant to the incoming
    /// prompt, and refresh any core memories created since bootstrap.
    pub async fn before_agent_start(&self, session_key: &str, prompt: &str) -> Option<String> {
        let mut sections = Vec::new();

        let bootstrapped = self
            .sessions
            .with_session(session_key, |state| state.bootstrapped);
        if bootstrapped {
            if let Ok(core) = self.store.core_memories(Some(&self.agent_id)).await {
                let fresh: Vec<&Memory> = {
                    let known = self
                        .sessions
                        .with_session(session_key, |state| state.injected_core_ids.clone());
                    core.iter().filter(|m| !known.contains(&m.id)).collect()
                };
                if !fresh.is_empty() {
                    debug!(count = fresh.len(), "mid-session core refresh");
                    let mut block = String::from("New core memories:\n");
                    for memory in &fresh {
                        block.push_str(&format!("- {}\n", memory.text));
                    }
                    sections.push(block);
                    self.sessions.with_session(session_key, |state| {
                        for memory in &fresh {
                            state.injected_core_ids.insert(memory.id.clone());
                        }
                    });
                }
            }
        }

        match self
            .search
            .search(prompt, self.config.hooks.recall_limit, Some(&self.agent_id))
            .await
        {
            Ok(results) if !results.is_empty() => {
                let mut block = String::from("Relevant memories:\n");
                for memory in &results {
                    block.push_str(&format!("- {}\n", memory.text));
                }
                sections.push(block);
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "auto-recall failed"),
        }

        if sections.is_empty() {
            None
        } else {
            Some(sections.join("\n"))
        }
    }

    /// Agent turn end: capture substantial turns in the background and
    /// maybe kick off a sleep cycle. Never blocks the hook path.
    pub fn agent_end(&self, session_key: &str, user_text: &str, assistant_text: Option<&str>) {
        if self.config.hooks.auto_capture {
            self.spawn_capture(session_key, user_text, MemorySource::AutoCapture);
            if let Some(text) = assistant_text {
                self.spawn_capture(session_key, text, MemorySource::AutoCaptureAssistant);
            }
        }
        if self.config.hooks.auto_sleep {
            self.maybe_spawn_sleep();
        }
    }

    /// Compaction rewrites the conversation, so injected context is gone;
    /// treat it like a fresh session.
    pub fn after_compaction(&self, session_key: &str) {
        self.sessions.reset(session_key);
    }

    pub fn session_end(&self, session_key: &str) {
        self.sessions.reset(session_key);
    }

    fn spawn_capture(&self, session_key: &str, text: &str, source: MemorySource) {
        if !should_capture(text) {
            return;
        }
        let tools = Arc::clone(&self.tools);
        let text = text.to_string();
        let session_key = session_key.to_string();
        tokio::spawn(async move {
            match tools
                .store_inner(&text, None, None, source, Some(session_key))
                .await
            {
                Ok(response) => debug!(?response, "auto-capture"),
                Err(e) => debug!(error = %e, "auto-capture failed"),
            }
        });
    }

    /// Spawn a sleep cycle unless one is running or the last one finished
    /// too recently.
    fn maybe_spawn_sleep(&self) {
        let min_interval =
            Duration::from_secs(self.config.sleep.min_interval_minutes * 60);
        {
            let last = self
                .last_sleep
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(finished) = *last
                && finished.elapsed() < min_interval
            {
                debug!("auto-sleep skipped, ran recently");
                return;
            }
        }
        if self
            .sleep_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("auto-sleep skipped, already running");
            return;
        }

        let cycle = SleepCycle::new(
            Arc::clone(&self.store),
            self.reasoner.clone(),
            self.ledger.clone(),
            self.config.sleep.clone(),
            self.config.decay.clone(),
            SleepOptions {
                agent_id: Some(self.agent_id.clone()),
                skip_semantic: false,
                workspace: self.config.hooks.workspace_dir.clone().map(PathBuf::from),
            },
        );
        let running = Arc::clone(&self.sleep_running);
        let last_sleep = Arc::clone(&self.last_sleep);
        tokio::spawn(async move {
            let report = cycle.run(&CancellationToken::new()).await;
            info!(summary = %report.summary(), "auto-sleep finished");
            *last_sleep
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
            running.store(false, Ordering::Release);
        });
    }
}

fn render_core(core: &[Memory]) -> String {
    let mut out = String::from("# Core memories\n\n");
    for memory in core {
        out.push_str(&format!("- {}\n", memory.text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use noctis_core::NoctisError;
    use noctis_core::types::MemoryCategory;

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingBackend for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, NoctisError> {
            let lowered = text.to_lowercase();
            Ok(if lowered.contains("coffee") {
                vec![1.0, 0.0, 0.0, 0.0]
            } else if lowered.contains("berlin") {
                vec![0.0, 1.0, 0.0, 0.0]
            } else {
                vec![0.0, 0.0, 1.0, 0.0]
            })
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NoctisError> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    async fn hooks() -> MemoryHooks {
        let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
        MemoryHooks::new(store, Arc::new(StubEmbedder), None, None, NoctisConfig::default())
    }

    #[tokio::test]
    async fn bootstrap_injects_core_memories() {
        let hooks = hooks().await;
        let tools = hooks.tools();
        tools
            .memory_store("the user's name is Mira", None, Some(MemoryCategory::Core))
            .await;

        let file = hooks.agent_bootstrap("s1").await.unwrap();
        assert!(file.content.contains("Mira"));

        // No new core memories, so the next turn injects nothing extra
        // beyond recall.
        let injected = hooks.before_agent_start("s1", "zzz unrelated zzz").await;
        assert!(
            injected
                .map(|s| !s.contains("New core memories"))
                .unwrap_or(true)
        );
    }

    #[tokio::test]
    async fn bootstrap_with_empty_store_injects_nothing() {
        let hooks = hooks().await;
        assert!(hooks.agent_bootstrap("s1").await.is_none());
    }

    #[tokio::test]
    async fn core_memories_created_mid_session_are_refreshed() {
        let hooks = hooks().await;
        hooks.agent_bootstrap("s1").await;

        let tools = hooks.tools();
        tools
            .memory_store("coffee must be decaf after noon", None, Some(MemoryCategory::Core))
            .await;

        let injected = hooks.before_agent_start("s1", "coffee").await.unwrap();
        assert!(injected.contains("New core memories"));
        assert!(injected.contains("decaf"));

        // A second turn must not re-inject the same core memory.
        let again = hooks.before_agent_start("s1", "zzz unrelated zzz").await;
        assert!(
            again
                .map(|s| !s.contains("New core memories"))
                .unwrap_or(true)
        );
    }

    #[tokio::test]
    async fn recall_is_injected_for_relevant_prompts() {
        let hooks = hooks().await;
        let tools = hooks.tools();
        tools
            .memory_store("the user drinks coffee with oat milk", None, None)
            .await;

        let injected = hooks.before_agent_start("s1", "coffee order").await.unwrap();
        assert!(injected.contains("oat milk"));
    }

    #[tokio::test]
    async fn compaction_resets_bootstrap_state() {
        let hooks = hooks().await;
        let tools = hooks.tools();
        tools
            .memory_store("the user's name is Mira", None, Some(MemoryCategory::Core))
            .await;
        hooks.agent_bootstrap("s1").await;
        hooks.after_compaction("s1");

        // Post-compaction the session is no longer bootstrapped, so the
        // refresh path stays quiet until the host bootstraps again.
        let injected = hooks.before_agent_start("s1", "zzz unrelated zzz").await;
        assert!(
            injected
                .map(|s| !s.contains("New core memories"))
                .unwrap_or(true)
        );
    }

    #[tokio::test]
    async fn auto_capture_stores_substantial_turns() {
        let hooks = hooks().await;
        hooks.agent_end(
            "s1",
            "I decided the Berlin office move happens in March",
            None,
        );
        // Capture is fire-and-forget; poll for the write.
        let mut stored = 0;
        for _ in 0..50 {
            stored = hooks.store.stats(None).await.unwrap().total_memories;
            if stored > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stored, 1);

        // Filler never reaches the store.
        hooks.agent_end("s1", "ok", None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hooks.store.stats(None).await.unwrap().total_memories, 1);
    }
}
