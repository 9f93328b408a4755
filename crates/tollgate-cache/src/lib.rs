// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification result cache for the Tollgate control plane.
//!
//! Content-addressed memoization with hit counting and batched expiry.

pub mod cache;
pub mod key;

pub use cache::ResultCache;
pub use key::{content_key, semantic_key};
