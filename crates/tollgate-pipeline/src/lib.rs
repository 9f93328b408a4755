// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end classification control flow for Tollgate.

pub mod pipeline;

pub use pipeline::{
    ClassificationPipeline, ClassificationRequest, PipelineOutcome, PipelineSettings,
};
