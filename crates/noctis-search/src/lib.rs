// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid three-signal memory search for Noctis.
//!
//! The orchestrator classifies the query, runs vector, BM25, and graph
//! signals in parallel, and fuses them with confidence-weighted reciprocal
//! rank fusion.

pub mod classify;
pub mod fuse;
pub mod search;

pub use classify::{QueryType, classify_query, signal_weights};
pub use fuse::{RankedSignal, fuse_signals, normalize_fused_scores};
pub use search::HybridSearch;
