// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host bindings: the agent tool-call surface, lifecycle hooks, the
//! attention gate, and per-session bookkeeping.

pub mod gate;
pub mod lifecycle;
pub mod session;
pub mod tools;

pub use gate::should_capture;
pub use lifecycle::{MemoryHooks, VirtualFile};
pub use session::{SessionState, SessionTracker};
pub use tools::{ForgetResponse, MemoryTools, RecallResponse, StoreResponse};
