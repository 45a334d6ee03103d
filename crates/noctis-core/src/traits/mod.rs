// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend trait definitions for pluggable collaborators.
//!
//! Both backends are reached over HTTP in production and mocked in tests;
//! `#[async_trait]` keeps them object-safe for dynamic dispatch.

pub mod embedding;
pub mod reasoning;

pub use embedding::EmbeddingBackend;
pub use reasoning::ReasoningBackend;
