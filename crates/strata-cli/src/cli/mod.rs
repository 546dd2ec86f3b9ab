//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "strata",
    bin_name = "strata",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Layered settings resolution",
    long_about = "Strata resolves a project's settings from a preload file, \
                  discovered layer files, secret files and prefixed environment \
                  variables, evaluating @format / @eval templates on read.",
    after_help = "EXAMPLES:\n\
        \x20 strata init\n\
        \x20 strata get database.host\n\
        \x20 DEMO_TZ=UTC strata get tz --origin\n\
        \x20 strata --env production list --output-format json\n\
        \x20 strata --log-sink=ingestion get log_dir",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print one resolved setting.
    #[command(
        about = "Print one resolved setting",
        after_help = "EXAMPLES:\n\
            \x20 strata get port\n\
            \x20 strata get database.host --origin\n\
            \x20 strata get now --output-format json"
    )]
    Get(GetArgs),

    /// Print every resolved setting.
    #[command(
        visible_alias = "ls",
        about = "Print every resolved setting",
        after_help = "EXAMPLES:\n\
            \x20 strata list\n\
            \x20 strata --env production list --output-format json"
    )]
    List,

    /// Show the loaded layers in precedence order.
    #[command(about = "Show loaded layers, lowest precedence first")]
    Layers,

    /// Write the default settings skeleton.
    #[command(
        about = "Create default settings files",
        after_help = "EXAMPLES:\n\
            \x20 strata init\n\
            \x20 strata -C ./services/ingest init --force"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 strata completions bash > ~/.local/share/bash-completion/completions/strata\n\
            \x20 strata completions zsh  > ~/.zfunc/_strata\n\
            \x20 strata completions fish > ~/.config/fish/completions/strata.fish"
    )]
    Completions(CompletionsArgs),
}

// ── get ───────────────────────────────────────────────────────────────────────

/// Arguments for `strata get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Dotted, case-insensitive key.
    #[arg(value_name = "KEY", help = "Setting key, e.g. database.host")]
    pub key: String,

    /// Also show which layer supplied the value.
    #[arg(long = "origin", help = "Show the layer that defines the key")]
    pub origin: bool,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `strata init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite existing files.
    #[arg(short = 'f', long = "force", help = "Overwrite existing settings files")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `strata completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── tests ─────────────────────────────────────────────────────────────────────
