//! CLI argument definitions for commlink.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// commlink -- messaging tools for LLM agents.
#[derive(Parser)]
#[command(
    name = "commlink",
    version,
    about = "commlink -- messaging tools for LLM agents",
    long_about = "Lists the available messaging tools and invokes one of them with a \
                  single raw agent input, printing the JSON outcome."
)]
pub struct Cli {
    /// Default log filter, used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every registered tool.
    List,

    /// Print one tool descriptor as JSON.
    Describe {
        /// Registry name of the tool, e.g. `telegramBot`.
        tool: String,
    },

    /// Print every credential descriptor as JSON.
    Credentials,

    /// Build a tool from a config file and invoke it once.
    Invoke {
        /// Registry name of the tool.
        tool: String,

        /// TOML file holding the tool configuration.
        #[arg(long, short)]
        config: PathBuf,

        /// Raw agent input.  Read from stdin when omitted.
        #[arg(long, short)]
        input: Option<String>,
    },
}
