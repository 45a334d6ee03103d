// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sleep-cycle consolidation engine for Noctis.
//!
//! Ten phases in fixed order: vector dedup, semantic dedup, conflict
//! detection, entity dedup, extraction, decay, orphan cleanup, noise
//! cleanup, credential scan, and optional task-ledger archival. Abort-safe
//! via a cancellation token; each phase is isolated so one failure never
//! stops the run.

pub mod engine;
pub mod ledger;
pub mod patterns;
pub mod report;

pub use engine::{SleepCycle, SleepOptions};
pub use ledger::TaskLedger;
pub use report::SleepReport;
