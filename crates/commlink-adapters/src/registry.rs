//! Tool registry.
//!
//! The registry is the host-facing surface of the crate: it lists the node
//! and credential descriptors, and turns a node name plus resolved
//! configuration into a ready [`AgentTool`].
//!
//! # Example
//!
//! ```rust
//! # use commlink_adapters::registry;
//! # use serde_json::json;
//! let values = json!({ "webhookURL": "https://hooks.slack.com/services/T0/B0/x" });
//! let tool = registry::build_tool("slackWebhook", values.as_object().cloned().unwrap()).unwrap();
//! assert_eq!(tool.definition().name, "Slack");
//!
//! assert!(registry::build_tool("smsGateway", Default::default()).is_err());
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::descriptor::{AdapterDescriptor, CredentialDescriptor};
use crate::error::{AdapterError, Result};
use crate::providers::octobot;
use crate::providers::telegram;
use crate::providers::webhook::{self, WebhookKind};
use crate::providers::whatsapp::{self, GatewayTool};
use crate::traits::AgentTool;

/// Every node descriptor, in display order.
pub fn descriptors() -> Vec<AdapterDescriptor> {
    let mut all = vec![
        telegram::descriptor(),
        webhook::descriptor(WebhookKind::Slack),
        webhook::descriptor(WebhookKind::Discord),
    ];
    all.extend(GatewayTool::ALL.into_iter().map(whatsapp::descriptor));
    all.push(octobot::descriptor());
    all
}

/// Every credential descriptor.
pub fn credential_descriptors() -> Vec<CredentialDescriptor> {
    vec![octobot::credential_descriptor()]
}

/// Look up one node descriptor by name.
pub fn descriptor(name: &str) -> Option<AdapterDescriptor> {
    descriptors().into_iter().find(|d| d.name == name)
}

/// Construct the tool registered under `name`.
///
/// Missing or malformed static configuration fails here, before the tool
/// is ever handed to an agent.
pub fn build_tool(name: &str, values: ResolvedConfig) -> Result<Arc<dyn AgentTool>> {
    debug!(tool = name, fields = values.len(), "building tool");

    let tool: Arc<dyn AgentTool> = match name {
        telegram::NAME => Arc::new(telegram::build(values)?),
        webhook::SLACK_NAME => Arc::new(webhook::build(WebhookKind::Slack, values)?),
        webhook::DISCORD_NAME => Arc::new(webhook::build(WebhookKind::Discord, values)?),
        octobot::NAME => Arc::new(octobot::build(values)?),
        other => match GatewayTool::from_node_name(other) {
            Some(gateway) => Arc::new(whatsapp::build(gateway, values)?),
            None => return Err(AdapterError::UnknownTool(other.to_string())),
        },
    };
    Ok(tool)
}
