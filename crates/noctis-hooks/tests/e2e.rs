// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the memory pipeline: tool calls, lifecycle hooks,
//! hybrid recall, and the sleep cycle working against one in-memory store.
//!
//! Tests are independent and order-insensitive.

use std::sync::Arc;

use async_trait::async_trait;
use noctis_config::NoctisConfig;
use noctis_core::NoctisError;
use noctis_core::traits::EmbeddingBackend;
use noctis_core::types::MemoryCategory;
use noctis_hooks::{ForgetResponse, MemoryHooks, StoreResponse};
use noctis_sleep::{SleepCycle, SleepOptions};
use noctis_store::MemoryStore;
use tokio_util::sync::CancellationToken;

/// Deterministic embedder: topic words map to fixed unit directions so
/// similarity is fully controlled by the test.
struct TopicEmbedder;

#[async_trait]
impl EmbeddingBackend for TopicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NoctisError> {
        let lowered = text.to_lowercase();
        Ok(if lowered.contains("coffee") {
            vec![1.0, 0.0, 0.0, 0.0]
        } else if lowered.contains("cycling") {
            vec![0.0, 1.0, 0.0, 0.0]
        } else if lowered.contains("lisbon") {
            vec![0.0, 0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 0.0, 1.0]
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

async fn harness() -> (Arc<MemoryStore>, MemoryHooks) {
    let store = Arc::new(MemoryStore::open_in_memory(4).await.unwrap());
    let hooks = MemoryHooks::new(
        Arc::clone(&store),
        Arc::new(TopicEmbedder),
        None,
        None,
        NoctisConfig::default(),
    );
    (store, hooks)
}

#[tokio::test]
async fn store_then_recall_round_trip() {
    let (_store, hooks) = harness().await;
    let tools = hooks.tools();

    let created = tools
        .memory_store("user drinks coffee with oat milk", None, None)
        .await;
    assert!(matches!(created, StoreResponse::Created { .. }));
    tools
        .memory_store("goes cycling on weekends", None, None)
        .await;

    let injected = hooks
        .before_agent_start("s1", "what coffee does the user like")
        .await
        .expect("recall should inject context");
    assert!(injected.contains("oat milk"));
    assert!(!injected.contains("cycling"));
}

#[tokio::test]
async fn duplicate_store_never_writes_twice() {
    let (store, hooks) = harness().await;
    let tools = hooks.tools();

    tools
        .memory_store("coffee must be a flat white", None, None)
        .await;
    let second = tools
        .memory_store("coffee should be a flat white", None, None)
        .await;
    assert!(matches!(second, StoreResponse::Duplicate { .. }));
    assert_eq!(store.stats(None).await.unwrap().total_memories, 1);
}

#[tokio::test]
async fn forget_by_query_requires_a_confident_single_match() {
    let (_store, hooks) = harness().await;
    let tools = hooks.tools();

    tools
        .memory_store("user lives in Lisbon near the river", None, None)
        .await;
    let response = tools.memory_forget(Some("lisbon"), None).await;
    match response {
        ForgetResponse::Deleted { .. } | ForgetResponse::Candidates { .. } => {}
        other => panic!("expected deletion or candidates, got {other:?}"),
    }
}

#[tokio::test]
async fn sleep_cycle_consolidates_what_the_tools_wrote() {
    let (store, hooks) = harness().await;
    let tools = hooks.tools();

    tools
        .memory_store("coffee order is a flat white", Some(0.9), None)
        .await;
    tools
        .memory_store("goes cycling on weekends", None, None)
        .await;
    let before = store.stats(None).await.unwrap().total_memories;

    let cycle = SleepCycle::new(
        Arc::clone(&store),
        None,
        None,
        NoctisConfig::default().sleep,
        NoctisConfig::default().decay,
        SleepOptions::default(),
    );
    let report = cycle.run(&CancellationToken::new()).await;
    assert!(!report.aborted);
    assert!(report.phase_errors.is_empty());
    let after = store.stats(None).await.unwrap().total_memories;
    assert!(after <= before);
}

#[tokio::test]
async fn bootstrap_and_recall_share_one_session_state() {
    let (_store, hooks) = harness().await;
    let tools = hooks.tools();
    tools
        .memory_store("user's name is Rui", None, Some(MemoryCategory::Core))
        .await;

    let file = hooks.agent_bootstrap("session-a").await.unwrap();
    assert!(file.content.contains("Rui"));

    // Add a new core memory post-bootstrap; the next turn refreshes it.
    tools
        .memory_store("coffee is always decaf", None, Some(MemoryCategory::Core))
        .await;
    let injected = hooks
        .before_agent_start("session-a", "anything at all")
        .await
        .unwrap();
    assert!(injected.contains("New core memories"));
    assert!(injected.contains("decaf"));
}
