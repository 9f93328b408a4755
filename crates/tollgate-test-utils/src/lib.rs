// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tollgate control-plane tests.
//!
//! Provides deterministic doubles for every injected dependency, enabling
//! fast, CI-runnable tests without a database or external API:
//!
//! - [`ManualClock`] - explicitly advanced clock for window/expiry tests
//! - [`MemoryQuotaStore`], [`MemoryCacheStore`], [`MemoryJobStore`] -
//!   in-memory store implementations with fault injection
//! - [`MockGateway`] - call gateway with pre-configured responses

pub mod clock;
pub mod gateway;
pub mod memory;

pub use clock::ManualClock;
pub use gateway::MockGateway;
pub use memory::{MemoryCacheStore, MemoryJobStore, MemoryQuotaStore};
