//! Configuration resolution for the CLI host.
//!
//! A tool config file is a flat TOML table whose keys are the descriptor
//! input names.  String values may reference environment variables as
//! `${VAR}`; references are resolved after `.env` has been loaded.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use commlink_adapters::ResolvedConfig;
use serde_json::Value;
use tracing::debug;

/// Read `path` and resolve it into the map handed to the registry.
pub fn load_config(path: &Path) -> Result<ResolvedConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content, |name| std::env::var(name).ok())
        .with_context(|| format!("invalid config file {}", path.display()))
}

/// Parse TOML `content`, resolving `${VAR}` references through `lookup`.
pub fn parse_config(
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let table: toml::Table = content.parse().context("config is not valid TOML")?;

    let mut values = ResolvedConfig::new();
    for (key, raw) in table {
        let value = serde_json::to_value(raw)
            .with_context(|| format!("config key `{key}` cannot be represented as JSON"))?;
        let value = match value {
            Value::String(s) => Value::String(
                substitute(&s, &lookup).with_context(|| format!("config key `{key}`"))?,
            ),
            other => other,
        };
        values.insert(key, value);
    }

    debug!(fields = values.len(), "config resolved");
    Ok(values)
}

/// Replace every `${VAR}` in `text` with its value from `lookup`.
fn substitute(text: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            bail!("unterminated variable reference in `{text}`");
        };
        let name = &after[..end];
        if name.is_empty() {
            bail!("empty variable reference");
        }
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => bail!("environment variable `{name}` is not set"),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Use `input` when given, otherwise read all of stdin.
pub fn read_input(input: Option<String>) -> Result<String> {
    if let Some(input) = input {
        return Ok(input);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read input from stdin")?;
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}
