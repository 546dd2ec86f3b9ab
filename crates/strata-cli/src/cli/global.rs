//! Global arguments that apply to every subcommand.
//!
//! Declared here and flattened into [`super::Cli`] so that `-v`, `-q`,
//! `--project-dir`, etc. are available on any invocation without repetition.

use clap::Args;
use std::path::PathBuf;

/// Global arguments for all commands.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Increase logging verbosity.
    ///
    /// Pass once for INFO (`-v`), twice for DEBUG (`-vv`), three times for
    /// TRACE (`-vvv`).  Conflicts with `--quiet`.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase verbosity (-v, -vv, -vvv)",
        long_help = "Increase logging verbosity:
    (none)  - Only warnings and errors
    -v      - Info level (layers loaded, sinks attached)
    -vv     - Debug level (discovery and overrides)
    -vvv    - Trace level (very verbose)"
    )]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    /// Disable ANSI colour codes.
    ///
    /// Automatically honoured when `NO_COLOR` is set in the environment
    /// (see <https://no-color.org>).
    #[arg(
        long = "no-color",
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new(),
        help = "Disable colored output"
    )]
    pub no_color: bool,

    /// Project directory; becomes `base_dir` and names the project.
    #[arg(
        short = 'C',
        long = "project-dir",
        global = true,
        value_name = "DIR",
        help = "Project directory (default: current directory)"
    )]
    pub project_dir: Option<PathBuf>,

    /// Directory scanned for layer files.
    #[arg(
        long = "settings-dir",
        global = true,
        value_name = "DIR",
        help = "Settings directory (default: <project-dir>/settings)"
    )]
    pub settings_dir: Option<PathBuf>,

    /// The preload file.
    #[arg(
        long = "preload",
        global = true,
        value_name = "FILE",
        help = "Preload file (default: <settings-dir>/settings.toml)"
    )]
    pub preload: Option<PathBuf>,

    /// Active environment section.
    #[arg(
        short = 'e',
        long = "env",
        global = true,
        value_name = "NAME",
        help = "Environment section (default: $ENV_FOR_<PREFIX> or development)"
    )]
    pub env: Option<String>,

    /// Environment variable prefix for overrides.
    #[arg(
        long = "prefix",
        global = true,
        value_name = "PREFIX",
        help = "Override variable prefix (default: derived from project name)"
    )]
    pub prefix: Option<String>,

    /// Directory of secret layer files.
    #[arg(
        long = "secrets-dir",
        global = true,
        value_name = "DIR",
        help = "Secrets directory (default: $SECRETS_FOR_<PREFIX>)"
    )]
    pub secrets_dir: Option<PathBuf>,

    /// Also write logs as JSON lines under `log_dir`.
    ///
    /// `--log-sink` writes `<project>.jsonl`; `--log-sink=NAME` writes
    /// `<project>__NAME.jsonl`.
    #[arg(
        long = "log-sink",
        global = true,
        value_name = "SUFFIX",
        num_args = 0..=1,
        require_equals = true,
        help = "Attach a JSON-lines log file (optionally with a suffix)"
    )]
    pub log_sink: Option<Option<String>>,

    /// Machine-readable output format.
    #[arg(
        long = "output-format",
        global = true,
        value_enum,
        default_value = "auto",
        help = "Output format"
    )]
    pub output_format: OutputFormat,
}

/// How the CLI should render its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Human-readable with colors.
    Human,
    /// Plain text without colors.
    Plain,
    /// JSON output.
    Json,
}
