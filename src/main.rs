//! # BT - Bug Tracker CLI
//!
//! A command-line task and bug tracker for a small team of developers and managers,
//! with an approval lifecycle, time logging and dashboard statistics.
//!
//! ## Key Features
//!
//! - **Approval Lifecycle**: open → in-progress → pending-approval → closed, with managers
//!   approving, rejecting or reopening work
//! - **Role-Scoped Views**: managers see every task, developers see what they are assigned
//! - **Time Logging**: assignees log hours per work date; totals are always derived from entries
//! - **Dashboards**: status counts, a 7-day activity trend, recent activity and time rollups
//! - **Local File Storage**: a single JSON store holding users, tasks and the current session
//!
//! ## Quick Start
//!
//! ```bash
//! # Sign in (every account shares the same passphrase)
//! bt login john@example.com --password password123
//!
//! # List your tasks, most recently updated first
//! bt list
//!
//! # Start work, log time, then ask for approval
//! bt start 1
//! bt log 1 2.5 --desc "Tracing the validator"
//! bt submit 1
//!
//! # As a manager
//! bt login sarah@example.com --password password123
//! bt approve 1
//! bt dashboard
//! ```
//!
//! Data is stored in `~/.bugtrack/store.json` unless `--store` points elsewhere.
//! Set `RUST_LOG=bug_tracker=debug` to see store reads and writes on stderr.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod aggregate;
pub mod cli;
pub mod cmd;
pub mod db;
pub mod error;
pub mod fields;
pub mod lifecycle;
pub mod session;
pub mod store;
pub mod task;
pub mod user;
pub mod workspace;

use aggregate::TaskFilter;
use cli::Cli;
use cmd::*;
use error::Result;
use lifecycle::Transition;
use store::FileStore;
use workspace::Workspace;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bug_tracker=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store_path = cli.store.clone().unwrap_or_else(default_store_path);
    tracing::debug!(path = %store_path.display(), "using store");

    if let Err(e) = run(cli.command, &store_path) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `$HOME/.bugtrack/store.json`, falling back to the working directory.
fn default_store_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".bugtrack").join("store.json")
}

fn run(command: Commands, store_path: &Path) -> Result<()> {
    // Opened per command so that `completions` never touches the store.
    let open = || Workspace::open(FileStore::new(store_path));

    match command {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }

        Commands::Login { email, password } => cmd_login(&mut open()?, &email, &password),

        Commands::Logout => cmd_logout(&mut open()?),

        Commands::Whoami => cmd_whoami(&open()?),

        Commands::Users => cmd_users(&mut open()?),

        Commands::List { search, status, priority, assignee, sort, order, limit } => {
            let filter = TaskFilter {
                search,
                statuses: status,
                priorities: priority,
                assignees: assignee,
                sort_by: sort,
                order,
            };
            cmd_list(&mut open()?, &filter, limit)
        }

        Commands::View { id } => cmd_view(&mut open()?, &id),

        Commands::Add { title, desc, priority, assignee, due, tags } =>
            cmd_add(&mut open()?, title, desc, priority, assignee, due, tags),

        Commands::Update { id, title, desc, priority, assignee, due, clear_due, add_tags, rm_tags } =>
            cmd_update(&mut open()?, &id, title, desc, priority, assignee, due, clear_due, add_tags, rm_tags),

        Commands::Start { id } => cmd_transition(&mut open()?, &id, Transition::Start),

        Commands::Submit { id } => cmd_transition(&mut open()?, &id, Transition::Submit),

        Commands::Approve { id } => cmd_transition(&mut open()?, &id, Transition::Approve),

        Commands::Reject { id } => cmd_transition(&mut open()?, &id, Transition::Reject),

        Commands::Reopen { id } => cmd_transition(&mut open()?, &id, Transition::Reopen),

        Commands::Delete { id } => cmd_delete(&mut open()?, &id),

        Commands::Log { id, hours, desc, date } => cmd_log(&mut open()?, &id, hours, desc, date),

        Commands::Dashboard => cmd_dashboard(&mut open()?),

        Commands::Time => cmd_time(&mut open()?),

        Commands::Tags => cmd_tags(&mut open()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_complete::Shell;

    #[test]
    fn test_completions_leave_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        run(Commands::Completions { shell: Shell::Bash }, &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_commands_open_and_seed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        run(Commands::Users, &path).unwrap();
        assert!(path.exists());
    }
}
