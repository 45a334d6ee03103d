// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reasoning backend for Noctis: structure extraction, importance rating,
//! and dedup/conflict verdicts over an OpenAI-compatible chat endpoint.

pub mod client;
pub mod parse;
pub mod prompts;

pub use client::ReasonClient;
