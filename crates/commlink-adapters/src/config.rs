//! Typed adapter configuration.
//!
//! The host hands each tool a [`ResolvedConfig`]: credential fields that are
//! already decrypted, merged with the node-level inputs.  Provider modules
//! deserialize it into their own config struct (rejecting unknown keys) and
//! then check required values with [`require`] and [`require_url`].
//! Construction fails fast; nothing is coerced silently.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{AdapterError, Result};

/// Fully resolved configuration values, keyed by descriptor field name.
pub type ResolvedConfig = Map<String, Value>;

/// Deserialize `values` into a typed config for `tool`.
pub fn from_resolved<T: DeserializeOwned>(tool: &str, values: ResolvedConfig) -> Result<T> {
    serde_json::from_value(Value::Object(values)).map_err(|e| AdapterError::InvalidConfig {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Return the trimmed value of a required field, or `MissingConfig`.
pub fn require(tool: &str, field: &str, value: Option<&str>) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AdapterError::MissingConfig {
            tool: tool.to_string(),
            field: field.to_string(),
        })
}

/// Like [`require`], but the value must also be an absolute `http(s)` URL.
/// A trailing slash is dropped so paths can be appended.
pub fn require_url(tool: &str, field: &str, value: Option<&str>) -> Result<String> {
    let raw = require(tool, field, value)?;
    let parsed = url::Url::parse(&raw).map_err(|e| AdapterError::InvalidConfig {
        tool: tool.to_string(),
        reason: format!("`{field}` is not a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AdapterError::InvalidConfig {
            tool: tool.to_string(),
            reason: format!("`{field}` must use http or https"),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Treat blank optional strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accept a string, number or boolean where a string is expected.
///
/// Hosts often resolve ids such as `instance_id` to JSON numbers.
pub fn string_like<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        #[serde(default, rename = "apiToken")]
        api_token: Option<String>,
        #[serde(default, deserialize_with = "string_like")]
        instance_id: Option<String>,
    }

    fn values(v: Value) -> ResolvedConfig {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_resolved::<Sample>("sample", values(json!({ "apiTokn": "x" }))).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidConfig { .. }));
        assert!(err.to_string().contains("apiTokn"));
    }

    #[test]
    fn numeric_ids_are_accepted_as_strings() {
        let cfg: Sample =
            from_resolved("sample", values(json!({ "apiToken": "t", "instance_id": 1234 }))).unwrap();
        assert_eq!(cfg.instance_id.as_deref(), Some("1234"));
    }

    #[test]
    fn require_rejects_blank_values() {
        let err = require("sample", "apiToken", Some("   ")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing configuration for `sample`: `apiToken` is required"
        );
        assert_eq!(require("sample", "apiToken", Some(" t ")).unwrap(), "t");
    }

    #[test]
    fn require_url_checks_scheme_and_trims_slash() {
        assert_eq!(
            require_url("s", "apiUrl", Some("https://api.example.com/v1/")).unwrap(),
            "https://api.example.com/v1"
        );
        assert!(require_url("s", "apiUrl", Some("ftp://example.com")).is_err());
        assert!(require_url("s", "apiUrl", Some("not a url")).is_err());
    }

    #[test]
    fn non_blank_drops_whitespace() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Asia/Riyadh ".into())).as_deref(), Some("Asia/Riyadh"));
    }
}
