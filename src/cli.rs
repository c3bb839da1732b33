use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patchfinder")]
#[command(
    version,
    about = "Find names and email addresses leaked in commit patches",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Parser, Debug)]
pub enum Commands {
    /// Scan every commit patch of an account's repositories
    Scan(ScanArgs),
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// GitHub account whose repositories are scanned
    pub account: String,

    /// GitHub API token (falls back to $GITHUB_TOKEN)
    #[arg(env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Only report commits whose patch leaks this email address (case-sensitive)
    #[arg(long, value_name = "EMAIL")]
    pub search_email: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    pub format: OutputFormat,

    /// Output file (if not specified, writes to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to custom config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Per-request timeout (e.g. "30s", "2m")
    #[arg(long)]
    pub timeout: Option<String>,

    /// Do not scan repositories that are forks
    #[arg(long)]
    pub skip_forks: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Formatted table output for terminal
    Terminal,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}
