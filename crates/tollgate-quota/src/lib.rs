// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota limiter for the Tollgate control plane.
//!
//! Provides per-identifier admission control combining a fixed-window
//! hourly request cap with a fixed-window daily token budget. Identifiers
//! are opaque strings; `"{source}:{endpoint}"` is the conventional scheme.

pub mod limiter;
pub mod window;

pub use limiter::QuotaLimiter;
