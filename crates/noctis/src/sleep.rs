// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `noctis sleep` command implementation.
//!
//! Runs one full sleep cycle in the foreground. Ctrl-C cancels; the cycle
//! finishes its current item and reports partial progress.

use std::path::PathBuf;
use std::sync::Arc;

use noctis_config::NoctisConfig;
use noctis_core::NoctisError;
use noctis_sleep::{SleepCycle, SleepOptions};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context;

pub struct SleepArgs {
    pub agent: Option<String>,
    pub dedup_threshold: Option<f64>,
    pub decay_threshold: Option<f64>,
    pub decay_half_life: Option<f64>,
    pub batch_size: Option<usize>,
    pub delay: Option<u64>,
    pub max_semantic_pairs: Option<usize>,
    pub concurrency: Option<usize>,
    pub skip_semantic: bool,
    pub workspace: Option<PathBuf>,
}

pub async fn run(config: &NoctisConfig, args: SleepArgs) -> Result<(), NoctisError> {
    context::check_unit_range("dedup-threshold", args.dedup_threshold)?;
    context::check_unit_range("decay-threshold", args.decay_threshold)?;
    context::check_positive("decay-half-life", args.decay_half_life)?;
    context::check_nonzero("batch-size", args.batch_size)?;
    context::check_nonzero("max-semantic-pairs", args.max_semantic_pairs)?;
    context::check_nonzero("concurrency", args.concurrency)?;

    let mut sleep = config.sleep.clone();
    let mut decay = config.decay.clone();
    if let Some(v) = args.dedup_threshold {
        sleep.dedup_threshold = v;
    }
    if let Some(v) = args.decay_threshold {
        decay.retention_threshold = v;
    }
    if let Some(v) = args.decay_half_life {
        decay.half_life_days = v;
    }
    if let Some(v) = args.batch_size {
        sleep.extraction_batch_size = v;
    }
    if let Some(v) = args.delay {
        sleep.batch_delay_ms = v;
    }
    if let Some(v) = args.max_semantic_pairs {
        sleep.max_semantic_pairs = v;
    }
    if let Some(v) = args.concurrency {
        sleep.llm_concurrency = v;
    }

    let store = Arc::new(context::open_store(config).await?);
    let reasoner = context::reasoner(config)?;
    if reasoner.is_none() {
        warn!("no reasoning backend configured; semantic dedup, conflicts and extraction will be skipped");
    }

    let cycle = SleepCycle::new(
        store,
        reasoner,
        None,
        sleep,
        decay,
        SleepOptions {
            agent_id: args.agent,
            skip_semantic: args.skip_semantic,
            workspace: args.workspace,
        },
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("noctis: cancelling sleep cycle...");
            signal_token.cancel();
        }
    });

    let report = cycle.run(&cancel).await;
    println!("{}", report.summary());
    for error in &report.phase_errors {
        eprintln!("noctis: phase error: {error}");
    }
    if report.aborted {
        return Err(NoctisError::Internal("sleep cycle aborted".to_string()));
    }
    Ok(())
}
