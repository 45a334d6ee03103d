// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding backend for Noctis, speaking the OpenAI embeddings wire format.

pub mod client;
pub mod types;

pub use client::EmbedClient;
