// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tollgate control plane.
//!
//! This crate provides the foundational trait definitions, error type, and
//! domain types used throughout the Tollgate workspace: the injected store
//! traits the controllers run against, the clock abstraction all window
//! arithmetic is a pure function of, and the per-key lock utility that
//! keeps concurrent read-modify-write sequences atomic.

pub mod clock;
pub mod error;
pub mod sync;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::TollgateError;
pub use sync::KeyedMutex;
pub use traits::{CacheStore, CallGateway, JobStore, QuotaStore};
pub use types::{
    AdmissionDecision, CacheEntry, ClassificationOutcome, DenialReason, GatewayRequest,
    GatewayResponse, JobFilter, JobStatus, NewJob, ProcessingJob, QuotaPolicy, RateLimitRecord,
};
