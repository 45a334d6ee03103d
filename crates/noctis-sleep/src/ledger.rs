// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task-ledger collaborator seam.
//!
//! Archiving stale workspace tasks belongs to the host, not to the memory
//! system; the sleep cycle only drives it when a workspace is configured.

use std::path::Path;

use async_trait::async_trait;
use noctis_core::NoctisError;

/// External collaborator that archives stale tasks in a workspace.
#[async_trait]
pub trait TaskLedger: Send + Sync + 'static {
    /// Archive stale tasks under `workspace`, returning how many were
    /// archived.
    async fn archive_stale(&self, workspace: &Path) -> Result<usize, NoctisError>;
}
