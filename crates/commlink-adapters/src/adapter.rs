//! Generic tool adapter.
//!
//! [`ToolAdapter`] composes the four stage strategies behind the single
//! `invoke` operation.  Provider modules only supply strategies; the state
//! machine `Received → Parsed → Validated → Sent → Encoded` lives here, and
//! so does the only conversion from [`ToolError`] to an agent-visible
//! string.

use async_trait::async_trait;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{AdapterError, Result, ToolError};
use crate::outcome::Outcome;
use crate::traits::{
    AgentTool, InputParser, OutcomeEncoder, ProviderInvoker, RequestValidator, ToolDefinition,
};

/// User agent sent with every provider request.
pub const USER_AGENT: &str = concat!("commlink/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by one adapter instance.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(AdapterError::from)
}

/// A messaging tool assembled from stage strategies.
///
/// All fields are set once at construction and only read afterwards, so a
/// single adapter can serve concurrent `invoke` calls.
pub struct ToolAdapter<P, V, I, E> {
    definition: ToolDefinition,
    parser: P,
    validator: V,
    invoker: I,
    encoder: E,
}

impl<P, V, I, E> ToolAdapter<P, V, I, E>
where
    P: InputParser,
    V: RequestValidator,
    I: ProviderInvoker,
    E: OutcomeEncoder,
{
    /// Assemble a tool from its definition and strategies.
    pub fn new(definition: ToolDefinition, parser: P, validator: V, invoker: I, encoder: E) -> Self {
        Self {
            definition,
            parser,
            validator,
            invoker,
            encoder,
        }
    }

    /// The invoker, for provider-specific inspection in tests and hosts.
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Run every stage, short-circuiting on the first failure.
    async fn run(&self, raw_input: &str) -> std::result::Result<Outcome, ToolError> {
        let parsed = self.parser.parse(raw_input)?;
        debug!("stage: parsed");

        let validated = self.validator.validate(parsed).await?;
        debug!(recipients = validated.recipients.len(), "stage: validated");

        let response = self.invoker.send(&validated).await?;
        debug!(status = response.status, "stage: sent");

        self.encoder.encode(&validated, &response)
    }

    /// Invoke the tool and return the typed outcome.
    pub async fn invoke_outcome(&self, raw_input: &str) -> Outcome {
        let span = info_span!(
            "tool_invoke",
            tool = %self.definition.name,
            invocation_id = %Uuid::now_v7()
        );

        async {
            match self.run(raw_input).await {
                Ok(outcome) => {
                    info!(success = outcome.success, "tool invocation finished");
                    outcome
                }
                Err(err) => {
                    warn!(stage = err.kind(), error = %err, "tool invocation failed");
                    Outcome::from_error(&err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<P, V, I, E> AgentTool for ToolAdapter<P, V, I, E>
where
    P: InputParser,
    V: RequestValidator,
    I: ProviderInvoker,
    E: OutcomeEncoder,
{
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn invoke(&self, raw_input: &str) -> String {
        self.invoke_outcome(raw_input).await.to_json_string()
    }
}
