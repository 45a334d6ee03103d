// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod clusters;
pub mod decay;
pub mod entities;
pub mod memories;
pub mod search;
pub mod tags;
