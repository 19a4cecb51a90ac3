//! Messaging tool adapters for LLM agents: Telegram, Slack, Discord and
//! several WhatsApp gateways.
//!
//! Every tool is a [`ToolAdapter`] assembled from four strategies defined
//! in [`traits`] (parse, validate, send, encode) and exposed to agents
//! through [`AgentTool::invoke`], which always returns a JSON outcome
//! string.  Hosts discover and construct tools through [`registry`].

pub mod adapter;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod outcome;
pub mod parser;
pub mod providers;
pub mod registry;
pub mod request;
pub mod traits;
pub mod validator;

pub use adapter::ToolAdapter;
pub use config::ResolvedConfig;
pub use descriptor::{AdapterDescriptor, CredentialDescriptor, InputParam, ParamType};
pub use error::{AdapterError, Result, ToolError, ValidationError};
pub use outcome::Outcome;
pub use traits::{AgentTool, ToolDefinition};
