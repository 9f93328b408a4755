// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injected dependency traits.
//!
//! The control logic is storage-agnostic: each controller receives its
//! keyed store as a trait object, so it can run against SQLite in
//! production and in-memory doubles in tests. The call gateway is the
//! boundary to the actual outbound AI call, which the control plane gates
//! and records around but does not implement.

pub mod cache;
pub mod gateway;
pub mod jobs;
pub mod quota;

pub use cache::CacheStore;
pub use gateway::CallGateway;
pub use jobs::JobStore;
pub use quota::QuotaStore;
