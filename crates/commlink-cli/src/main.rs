//! CLI entry point for commlink.
//!
//! The `commlink` binary is a minimal host for the messaging tools: it
//! lists descriptors, resolves one tool's configuration and invokes it.

mod cli;
mod helpers;
mod host;

use anyhow::{Context, Result};
use clap::Parser;
use commlink_adapters::{AgentTool, registry};
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::helpers::init_tracing;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::List => cmd_list(),
        Commands::Describe { tool } => cmd_describe(&tool),
        Commands::Credentials => cmd_credentials(),
        Commands::Invoke {
            tool,
            config,
            input,
        } => cmd_invoke(&tool, &config, input).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommands: discovery
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    for d in registry::descriptors() {
        println!("{:<16} {:<18} {}", d.name, d.label, d.category);
    }
    Ok(())
}

fn cmd_describe(tool: &str) -> Result<()> {
    let descriptor =
        registry::descriptor(tool).with_context(|| format!("unknown tool `{tool}`"))?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

fn cmd_credentials() -> Result<()> {
    let all = registry::credential_descriptors();
    println!("{}", serde_json::to_string_pretty(&all)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: invoke
// ---------------------------------------------------------------------------

async fn cmd_invoke(
    tool: &str,
    config: &std::path::Path,
    input: Option<String>,
) -> Result<()> {
    // A missing .env is fine; variables may come from the shell.
    dotenvy::dotenv().ok();

    let values = host::load_config(config)?;
    let agent_tool = registry::build_tool(tool, values)
        .with_context(|| format!("failed to build tool `{tool}`"))?;
    let input = host::read_input(input)?;

    info!(tool, "invoking tool");
    let outcome = agent_tool.invoke(&input).await;
    println!("{outcome}");
    Ok(())
}
