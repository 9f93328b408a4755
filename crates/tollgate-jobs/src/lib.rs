// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processing job orchestration for the Tollgate control plane.
//!
//! A retryable state machine tracking long-running collection and
//! classification work items, retained indefinitely as audit records.

pub mod orchestrator;

pub use orchestrator::JobOrchestrator;
