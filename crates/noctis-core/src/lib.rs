// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Noctis memory engine.
//!
//! Provides the error type, domain types, and backend traits shared by every
//! crate in the workspace. The store, embedding, and reasoning backends all
//! speak through seams defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::NoctisError;
pub use traits::{EmbeddingBackend, ReasoningBackend};
pub use types::{
    ConflictVerdict, DuplicateVerdict, Entity, EntityKind, ExtractionOutcome, ExtractionStatus,
    ImportanceRating, Memory, MemoryCategory, MemorySource, ScoredMemory, SimilarMemory, Tag,
};
