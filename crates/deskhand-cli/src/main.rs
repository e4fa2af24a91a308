//! CLI entry point for Deskhand.
//!
//! This binary provides the `deskhand` command with subcommands for
//! authorizing Google accounts, inspecting stored credentials, and calling
//! the Gmail and Calendar tools.

mod agent_config;
mod cli;
mod config;
mod toolkits;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use deskhand_auth_engine::{CredentialBroker, ProviderSpec, provider};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::agent_config::AgentConfig;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::toolkits::{Toolkit, manifest};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "info" });

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        warn!(error = %e, "failed to load .env");
    }

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Auth { providers } => cmd_auth(&config, &providers).await,
        Commands::Revoke { provider } => cmd_revoke(&config, &provider),
        Commands::Status => cmd_status(&config),
        Commands::Tools { toolkits } => cmd_tools(&config, toolkits.as_deref()),
        Commands::Call { tool, args } => cmd_call(&config, &tool, &args).await,
        Commands::Agent { preset } => {
            cmd_agent(preset.as_deref().unwrap_or(&config.agent.preset))
        }
    }
}

fn broker(config: &Config) -> Result<CredentialBroker> {
    Ok(CredentialBroker::new(
        config.credential_store()?,
        Arc::new(config.authorization_server()),
        config.auth.client_secret.clone(),
    ))
}

// ---------------------------------------------------------------------------
// Subcommand: auth
// ---------------------------------------------------------------------------

async fn cmd_auth(config: &Config, names: &[String]) -> Result<()> {
    let providers: Vec<&'static ProviderSpec> = if names.is_empty() {
        provider::ALL.iter().collect()
    } else {
        names
            .iter()
            .map(|n| ProviderSpec::by_name(n))
            .collect::<deskhand_auth_engine::Result<_>>()?
    };

    let broker = broker(config)?;
    for spec in providers {
        let client = broker
            .acquire(spec)
            .await
            .with_context(|| format!("failed to authorize {spec}"))?;

        match client.expires_at() {
            Some(at) => println!("  [+] {spec}: authorized (token valid until {at})"),
            None => println!("  [+] {spec}: authorized"),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: revoke
// ---------------------------------------------------------------------------

fn cmd_revoke(config: &Config, name: &str) -> Result<()> {
    let spec = ProviderSpec::by_name(name)?;
    broker(config)?
        .revoke(spec)
        .with_context(|| format!("failed to revoke {spec}"))?;
    println!("  [-] {spec}: credential removed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(config: &Config) -> Result<()> {
    let broker = broker(config)?;

    println!();
    println!("  Deskhand Status");
    println!("  ===============");
    println!();

    let secret = &config.auth.client_secret;
    if secret.exists() {
        println!("  Client secret:    OK ({})", secret.display());
    } else {
        println!("  Client secret:    MISSING ({})", secret.display());
    }
    println!(
        "  Storage:          {:?} ({})",
        config.storage.backend,
        config.storage.data_dir.display()
    );
    println!();

    for spec in provider::ALL {
        println!("  {:<18}{}", format!("{spec}:"), broker.status(spec));
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: tools
// ---------------------------------------------------------------------------

fn cmd_tools(config: &Config, names: Option<&[String]>) -> Result<()> {
    let toolkits = match names {
        Some(names) => names
            .iter()
            .map(|n| Toolkit::by_name(n).with_context(|| format!("unknown toolkit `{n}`")))
            .collect::<Result<Vec<_>>>()?,
        None if config.agent.preset.exists() => AgentConfig::load(&config.agent.preset)?.toolkits,
        None => Toolkit::ALL.to_vec(),
    };

    println!("{}", serde_json::to_string_pretty(&manifest(&toolkits))?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: call
// ---------------------------------------------------------------------------

async fn cmd_call(config: &Config, tool: &str, args: &str) -> Result<()> {
    let params: serde_json::Value =
        serde_json::from_str(args).context("--args must be a JSON object")?;
    if !params.is_object() {
        bail!("--args must be a JSON object");
    }

    let Some(toolkit) = Toolkit::for_tool(tool) else {
        bail!("no toolkit provides `{tool}`; run `deskhand tools` for the list");
    };

    let client = broker(config)?
        .acquire(toolkit.provider())
        .await
        .with_context(|| format!("failed to obtain {toolkit} credentials"))?;

    info!(tool, toolkit = %toolkit, "calling tool");
    let output = toolkit.adapter(client).execute_tool(tool, params).await;
    println!("{output}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: agent
// ---------------------------------------------------------------------------

fn cmd_agent(preset: &Path) -> Result<()> {
    let agent = AgentConfig::load(preset)?;
    info!(agent = %agent.name, toolkits = agent.toolkits.len(), "agent description valid");

    let document = serde_json::json!({
        "agent": agent,
        "tools": manifest(&agent.toolkits),
    });
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
