//! # CLI Interface
//!
//! Defines the command-line argument structure for `tapauth-terminal` using
//! `clap` derive. Every subcommand that produces a tap writes the framed
//! record message to stdout as hex; every subcommand that consumes one
//! takes hex on `--message`. That hex stands in for the NFC link.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::LogFormat;

/// TapAuth reference terminal.
///
/// Issues and verifies payment tokens, runs the challenge/response flow,
/// and inspects tap messages. Output is JSON (or hex for tap messages) on
/// stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "tapauth-terminal",
    about = "TapAuth reference terminal",
    version,
    propagate_version = true
)]
pub struct TerminalCli {
    /// Path to a protocol configuration file (JSON).
    ///
    /// Missing fields fall back to defaults; omit the flag entirely to use
    /// the built-in defaults.
    #[arg(long, short = 'c', env = "TAPAUTH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(
        long,
        value_enum,
        env = "TAPAUTH_LOG_FORMAT",
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(
        long,
        env = "TAPAUTH_LOG",
        default_value = "tapauth_terminal=info,tapauth_protocol=info",
        global = true
    )]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a signing keypair and an agreement keypair.
    Keygen,
    /// Issue a signed payment token and frame it as a tap message.
    Issue(IssueArgs),
    /// Verify every token in a tap message.
    Verify(VerifyArgs),
    /// Issue a challenge and frame it as a tap message.
    Challenge(ChallengeArgs),
    /// Answer the challenge in a tap message.
    Respond(RespondArgs),
    /// Check a response message against a challenge message.
    VerifyResponse(VerifyResponseArgs),
    /// Decode a tap message and print every record.
    Inspect(InspectArgs),
    /// Frame a text record.
    Text(TextArgs),
    /// Frame a URI record.
    Uri(UriArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for `issue`.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Hex-encoded Ed25519 seed of the payer.
    ///
    /// **Never pass this flag on a shared machine**. Prefer the environment
    /// variable.
    #[arg(long, env = "TAPAUTH_SIGNING_KEY")]
    pub signing_key: String,

    /// Amount in minor units (cents).
    #[arg(long)]
    pub amount: i64,

    /// Three-letter currency code.
    #[arg(long, default_value = "EUR")]
    pub currency: String,

    /// Location cell of the payer.
    #[arg(long)]
    pub cell: String,

    /// Require the terminal to check the location cell.
    #[arg(long)]
    pub geo_auth: bool,

    /// UTF-8 payload to seal into the token.
    #[arg(long, requires = "encryption_key")]
    pub payload: Option<String>,

    /// Hex-encoded 32-byte key for sealing the payload.
    #[arg(long, env = "TAPAUTH_ENCRYPTION_KEY")]
    pub encryption_key: Option<String>,

    /// Flag the sealed payload as a memo.
    #[arg(long, requires = "payload")]
    pub memo: bool,
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Hex-encoded tap message.
    #[arg(long)]
    pub message: String,

    /// The terminal's own location cell, for geo-auth tokens.
    #[arg(long)]
    pub expected_cell: Option<String>,

    /// Proximity resolution; defaults to the configured value.
    #[arg(long)]
    pub resolution: Option<usize>,

    /// Hex-encoded key for opening sealed payloads of accepted tokens.
    #[arg(long, env = "TAPAUTH_ENCRYPTION_KEY")]
    pub decryption_key: Option<String>,
}

/// Arguments for `challenge`.
#[derive(Args, Debug)]
pub struct ChallengeArgs {
    /// Hex-encoded Ed25519 public key of the merchant.
    #[arg(long, env = "TAPAUTH_MERCHANT_KEY")]
    pub merchant_key: String,

    /// Amount in minor units (cents).
    #[arg(long)]
    pub amount: i64,

    /// Three-letter currency code.
    #[arg(long, default_value = "EUR")]
    pub currency: String,

    /// Location cell of the terminal.
    #[arg(long)]
    pub cell: String,

    /// Free text shown to the payer.
    #[arg(long)]
    pub memo: Option<String>,

    /// Also attach a receipt URI record.
    #[arg(long)]
    pub receipt_uri: Option<String>,
}

/// Arguments for `respond`.
#[derive(Args, Debug)]
pub struct RespondArgs {
    /// Hex-encoded tap message holding the challenge.
    #[arg(long)]
    pub message: String,

    /// Hex-encoded Ed25519 seed of the payer.
    #[arg(long, env = "TAPAUTH_SIGNING_KEY")]
    pub signing_key: String,

    /// Location cell of the payer.
    #[arg(long)]
    pub cell: String,

    /// UTF-8 breadcrumb to seal for the merchant.
    #[arg(long, requires = "encryption_key")]
    pub breadcrumb: Option<String>,

    /// Hex-encoded 32-byte key for sealing the breadcrumb.
    #[arg(long, env = "TAPAUTH_ENCRYPTION_KEY")]
    pub encryption_key: Option<String>,
}

/// Arguments for `verify-response`.
#[derive(Args, Debug)]
pub struct VerifyResponseArgs {
    /// Hex-encoded tap message holding the challenge.
    #[arg(long)]
    pub challenge: String,

    /// Hex-encoded tap message holding the response.
    #[arg(long)]
    pub response: String,

    /// Hex-encoded key for opening the breadcrumb.
    #[arg(long, env = "TAPAUTH_ENCRYPTION_KEY")]
    pub decryption_key: Option<String>,
}

/// Arguments for `inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Hex-encoded tap message.
    #[arg(long)]
    pub message: String,
}

/// Arguments for `text`.
#[derive(Args, Debug)]
pub struct TextArgs {
    /// The text to frame.
    pub text: String,

    /// Language code; defaults to the configured text language.
    #[arg(long)]
    pub language: Option<String>,
}

/// Arguments for `uri`.
#[derive(Args, Debug)]
pub struct UriArgs {
    /// The URI to frame.
    pub uri: String,
}
