// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Noctis - graph-backed long-term memory for conversational agents.
//!
//! This is the binary entry point for the noctis CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod cleanup;
mod context;
mod index;
mod list;
mod search;
mod sleep;
mod stats;

/// Noctis - graph-backed long-term memory for conversational agents.
#[derive(Parser, Debug)]
#[command(name = "noctis", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (overrides the XDG lookup).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List stored memories, newest first.
    List {
        /// Scope to a single agent.
        #[arg(long)]
        agent: Option<String>,
        /// Maximum memories to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Skip this many memories.
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Hybrid search over stored memories.
    Search {
        /// The search query.
        query: String,
        /// Maximum results.
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Scope to a single agent.
        #[arg(long)]
        agent: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show store statistics.
    Stats {
        /// Scope to a single agent.
        #[arg(long)]
        agent: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a sleep cycle (consolidation, extraction, decay, cleanup).
    Sleep {
        /// Scope to a single agent.
        #[arg(long)]
        agent: Option<String>,
        /// Similarity at or above which memories merge without an LLM call.
        #[arg(long)]
        dedup_threshold: Option<f64>,
        /// Decay score below which memories are pruned.
        #[arg(long)]
        decay_threshold: Option<f64>,
        /// Base decay half-life in days.
        #[arg(long)]
        decay_half_life: Option<f64>,
        /// Memories per extraction batch.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Delay between extraction batches, in milliseconds.
        #[arg(long)]
        delay: Option<u64>,
        /// Cap on LLM-judged semantic-dedup pairs.
        #[arg(long)]
        max_semantic_pairs: Option<usize>,
        /// Concurrent LLM calls within a phase.
        #[arg(long)]
        concurrency: Option<usize>,
        /// Skip the LLM-judged semantic-dedup phase.
        #[arg(long)]
        skip_semantic: bool,
        /// Workspace directory for the task-ledger phase.
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Re-embed every memory and rebuild the vector index.
    Index {
        /// Memories per embedding batch.
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
    },
    /// Prune decayed memories and graph orphans.
    Cleanup {
        /// Actually delete; the default is a dry run.
        #[arg(long)]
        execute: bool,
        /// Also clean orphan entities/tags and conversational noise.
        #[arg(long)]
        all: bool,
        /// Scope to a single agent.
        #[arg(long)]
        agent: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match context::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(code) => return code,
    };
    context::init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Commands::List {
            agent,
            limit,
            offset,
            json,
        } => list::run(&config, agent.as_deref(), limit, offset, json).await,
        Commands::Search {
            query,
            limit,
            agent,
            json,
        } => search::run(&config, &query, limit, agent.as_deref(), json).await,
        Commands::Stats { agent, json } => stats::run(&config, agent.as_deref(), json).await,
        Commands::Sleep {
            agent,
            dedup_threshold,
            decay_threshold,
            decay_half_life,
            batch_size,
            delay,
            max_semantic_pairs,
            concurrency,
            skip_semantic,
            workspace,
        } => {
            sleep::run(
                &config,
                sleep::SleepArgs {
                    agent,
                    dedup_threshold,
                    decay_threshold,
                    decay_half_life,
                    batch_size,
                    delay,
                    max_semantic_pairs,
                    concurrency,
                    skip_semantic,
                    workspace,
                },
            )
            .await
        }
        Commands::Index { batch_size } => index::run(&config, batch_size).await,
        Commands::Cleanup {
            execute,
            all,
            agent,
        } => cleanup::run(&config, execute, all, agent.as_deref()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("noctis: {e}");
            ExitCode::FAILURE
        }
    }
}
