// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary trait for the outbound AI call.

use async_trait::async_trait;

use crate::error::TollgateError;
use crate::types::{GatewayRequest, GatewayResponse};

/// The actual expensive call. The control plane wraps it with admission
/// checks and job bookkeeping; HTTP, authentication, and transport-level
/// retries all live behind this trait.
#[async_trait]
pub trait CallGateway: Send + Sync + 'static {
    /// Perform one synchronous model invocation.
    async fn invoke(&self, request: &GatewayRequest) -> Result<GatewayResponse, TollgateError>;
}
