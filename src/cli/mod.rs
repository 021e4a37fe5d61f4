//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Loopscan - detect loops and topology defects across artifact repository managers.
#[derive(Parser)]
#[command(name = "loopscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored text output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze a descriptor snapshot and report findings
    #[command(alias = "a")]
    Analyze(AnalyzeArgs),

    /// Export the resolved repository graph
    Graph(GraphArgs),

    /// List the available rules
    Rules,

    /// Print the default configuration file
    Init,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Snapshot file (.json or .toml)
    pub snapshot: PathBuf,

    /// Resolve bare names on other installations
    #[arg(long)]
    pub cross_instance: bool,

    /// Report chains with more repositories than this
    #[arg(long)]
    pub max_chain_length: Option<usize>,

    /// Exit with a non-zero status when any finding is reported
    #[arg(long)]
    pub fail_on_findings: bool,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Snapshot file (.json or .toml)
    pub snapshot: PathBuf,

    /// Emit Graphviz DOT instead of the selected format
    #[arg(long)]
    pub dot: bool,

    /// Resolve bare names on other installations
    #[arg(long)]
    pub cross_instance: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

impl From<OutputFormat> for crate::config::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Self::Json,
            OutputFormat::Markdown => Self::Markdown,
            OutputFormat::Text => Self::Text,
        }
    }
}
