// Copyright (c) 2026 TapAuth Contributors. MIT License.
// See LICENSE for details.

//! # TapAuth Reference Terminal
//!
//! Entry point for the `tapauth-terminal` binary. Parses CLI arguments,
//! initializes logging, loads the protocol configuration, and runs one
//! subcommand against a fresh [`PaymentProtocol`].
//!
//! The subcommands mirror both sides of a tap:
//!
//! - `keygen`          generate signing and agreement keys
//! - `issue`           payer side: sign a payment token
//! - `verify`          terminal side: verify the tokens in a tap
//! - `challenge`       terminal side: issue a challenge
//! - `respond`         payer side: answer a challenge
//! - `verify-response` terminal side: check the answer
//! - `inspect`, `text`, `uri`: record-level tooling
//! - `version`         print build version information

mod cli;
mod commands;
mod logging;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use tapauth_protocol::clock::SystemClock;
use tapauth_protocol::config::ProtocolConfig;
use tapauth_protocol::crypto::CryptoEngine;
use tapauth_protocol::PaymentProtocol;

use cli::{Commands, TerminalCli};

fn main() -> Result<()> {
    let cli = TerminalCli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "protocol configuration loaded");

    let protocol = PaymentProtocol::new(
        CryptoEngine::with_os_rng(),
        Arc::new(SystemClock),
        config,
    );
    let guard = protocol.replay_guard();

    let output = match &cli.command {
        Commands::Keygen => commands::keygen(&protocol)?,
        Commands::Issue(args) => commands::issue(&protocol, args)?,
        Commands::Verify(args) => commands::verify(&protocol, &guard, args)?,
        Commands::Challenge(args) => commands::challenge(&protocol, args)?,
        Commands::Respond(args) => commands::respond(&protocol, args)?,
        Commands::VerifyResponse(args) => commands::verify_response(&protocol, &guard, args)?,
        Commands::Inspect(args) => commands::inspect(args)?,
        Commands::Text(args) => commands::text(&protocol, args)?,
        Commands::Uri(args) => commands::uri(args)?,
        Commands::Version => {
            print_version();
            return Ok(());
        }
    };

    println!("{output}");
    Ok(())
}

/// Loads the protocol configuration, or the defaults when no path is given.
fn load_config(path: Option<&Path>) -> Result<ProtocolConfig> {
    let Some(path) = path else {
        return Ok(ProtocolConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config = ProtocolConfig::from_json(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    tracing::info!(path = %path.display(), "configuration file loaded");
    Ok(config)
}

/// Prints version information to stdout.
fn print_version() {
    println!("tapauth-terminal {}", env!("CARGO_PKG_VERSION"));
    println!("protocol         {}", tapauth_protocol::config::PROTOCOL_VERSION);
    println!("token version    {}", tapauth_protocol::config::TOKEN_VERSION);
}
