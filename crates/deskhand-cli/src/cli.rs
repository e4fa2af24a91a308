//! CLI argument definitions for Deskhand.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Deskhand -- Gmail and Google Calendar tools for agents.
#[derive(Parser)]
#[command(
    name = "deskhand",
    version,
    about = "Deskhand -- Gmail and Google Calendar tools for agents",
    long_about = "Authorizes Google accounts, keeps their OAuth tokens fresh, and exposes \
                  mail and calendar operations as agent tools."
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, short, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Obtain credentials, running the browser consent flow if needed.
    Auth {
        /// Providers to authorize (default: all).
        providers: Vec<String>,
    },

    /// Forget the stored credential for a provider.
    Revoke {
        /// Provider name, e.g. `gmail` or `google_calendar`.
        provider: String,
    },

    /// Show the stored credential state of every provider.
    Status,

    /// Print the tool manifest as JSON.
    Tools {
        /// Only include these toolkits (default: the agent preset's).
        #[arg(long, value_delimiter = ',')]
        toolkits: Option<Vec<String>>,
    },

    /// Invoke a single tool and print its output.
    Call {
        /// Tool name, e.g. `gmail_list_emails`.
        tool: String,

        /// Tool parameters as a JSON object.
        #[arg(long, short, default_value = "{}")]
        args: String,
    },

    /// Validate an agent description and emit it with its tool manifest.
    Agent {
        /// Agent description file (default: `[agent] preset` from config).
        #[arg(long, short)]
        preset: Option<PathBuf>,
    },
}
