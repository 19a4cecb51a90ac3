//! Core traits.
//!
//! A messaging tool is assembled from four strategies, one per stage of an
//! `invoke` call: [`InputParser`] → [`RequestValidator`] →
//! [`ProviderInvoker`] → [`OutcomeEncoder`].  The assembled tool is exposed
//! to agents through [`AgentTool`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::outcome::Outcome;
use crate::request::{ParsedRequest, ProviderResponse, ValidatedRequest};

/// Result type for a single stage of an `invoke` call.
pub type StageResult<T> = std::result::Result<T, ToolError>;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A tool as presented to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Machine-readable tool name (e.g. `telegram`, `whatsappTool`).
    pub name: String,
    /// Human-readable description, including the accepted input formats.
    pub description: String,
    /// JSON Schema describing the structured (JSON) input form.
    pub parameters: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Stage strategies
// ---------------------------------------------------------------------------

/// Turns one opaque agent string into a typed request.
pub trait InputParser: Send + Sync {
    /// Parse `raw`, failing with [`ToolError::Parse`] when no accepted
    /// format matches.
    fn parse(&self, raw: &str) -> StageResult<ParsedRequest>;
}

/// Checks provider preconditions before anything is sent.
#[async_trait]
pub trait RequestValidator: Send + Sync {
    /// Validate `request`, resolving any media it references.
    async fn validate(&self, request: ParsedRequest) -> StageResult<ValidatedRequest>;
}

/// Sends a validated request over one provider's wire contract.
#[async_trait]
pub trait ProviderInvoker: Send + Sync {
    /// Perform the HTTP call.  Only network-level failures are errors here;
    /// business failures are judged by the encoder.
    async fn send(&self, request: &ValidatedRequest) -> StageResult<ProviderResponse>;
}

/// Maps a provider response onto a success outcome.
pub trait OutcomeEncoder: Send + Sync {
    /// Encode `response`, failing with [`ToolError::Provider`] when the
    /// provider signals failure.
    fn encode(
        &self,
        request: &ValidatedRequest,
        response: &ProviderResponse,
    ) -> StageResult<Outcome>;
}

// ---------------------------------------------------------------------------
// Agent-facing trait
// ---------------------------------------------------------------------------

/// The single operation an agent can perform on a messaging tool.
///
/// `invoke` never fails: every error becomes a `success: false` envelope
/// in the returned string.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Name, description and input schema shown to the agent.
    fn definition(&self) -> ToolDefinition;

    /// Run one independent send with the agent-generated input.
    async fn invoke(&self, raw_input: &str) -> String;
}
