//! Declarative descriptors read by the host registry.
//!
//! A descriptor tells the host which configuration fields to render and
//! which credential to resolve before calling
//! [`registry::build_tool`](crate::registry::build_tool).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category shared by every messaging tool.
pub const CATEGORY_COMMUNICATION: &str = "Communication";

/// The input widget type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Password,
    Number,
    Boolean,
    Options,
    Json,
}

/// One selectable value of an `options` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamOption {
    pub label: String,
    pub name: String,
}

impl ParamOption {
    pub fn new(label: &str, name: &str) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
        }
    }
}

/// A configuration field declared by a tool or a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParam {
    pub label: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ParamOption>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub additional_params: bool,
}

impl InputParam {
    /// A required field of the given type.
    pub fn new(label: &str, name: &str, kind: ParamType) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            kind,
            description: None,
            default: None,
            placeholder: None,
            options: Vec::new(),
            optional: false,
            additional_params: false,
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn placeholder(mut self, text: &str) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn options(mut self, options: Vec<ParamOption>) -> Self {
        self.options = options;
        self
    }

    /// Mark as optional and hide it under "additional parameters".
    pub fn additional(mut self) -> Self {
        self.optional = true;
        self.additional_params = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A named credential the host must resolve before construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRef {
    pub label: String,
    pub name: String,
    pub credential_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Node descriptor for one messaging tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub name: String,
    pub label: String,
    pub version: f32,
    pub category: String,
    pub description: String,
    pub inputs: Vec<InputParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<CredentialRef>,
}

impl AdapterDescriptor {
    /// A version-1.0 descriptor in the communication category.
    pub fn communication(name: &str, label: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            version: 1.0,
            category: CATEGORY_COMMUNICATION.into(),
            description: description.into(),
            inputs: Vec::new(),
            credential: None,
        }
    }

    pub fn inputs(mut self, inputs: Vec<InputParam>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn credential(mut self, credential: CredentialRef) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Look up a declared input by name.
    pub fn input(&self, name: &str) -> Option<&InputParam> {
        self.inputs.iter().find(|p| p.name == name)
    }
}

/// Descriptor of a stored credential type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    pub name: String,
    pub label: String,
    pub version: f32,
    pub description: String,
    pub inputs: Vec<InputParam>,
}
