use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Role-aware bug tracker with approvals and time logging.
/// Storage defaults to ~/.bugtrack/store.json or a path passed via --store.
#[derive(Parser)]
#[command(name = "bt", version, about = "Task and bug tracking CLI")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
