// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache key construction.
//!
//! Two schemes: a content hash of normalized classification input, so
//! identical inputs always map to the same key, and an explicit semantic
//! key carrying the model version, so results never survive a model bump.

use sha2::{Digest, Sha256};

/// Content-addressed key: `"sha256:" + hex(sha256(input))`.
///
/// Callers are responsible for normalizing `input` (whitespace, casing)
/// before hashing; the cache treats the key as opaque.
pub fn content_key(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    format!("sha256:{}", hex::encode(digest))
}

/// Semantic key: `"{entity_type}:{entity_id}:{model_version}"`.
pub fn semantic_key(entity_type: &str, entity_id: &str, model_version: &str) -> String {
    format!("{entity_type}:{entity_id}:{model_version}")
}
