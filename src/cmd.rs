//! Command implementations for the CLI interface.
//!
//! This module contains the handlers behind each subcommand. Handlers talk to
//! the core only through a [`Workspace`] and print their results as plain tables.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use chrono::{Local, NaiveDate};

use crate::aggregate::*;
use crate::db::*;
use crate::error::{Result, TrackerError};
use crate::fields::*;
use crate::lifecycle::{available_transitions, Transition};
use crate::store::KeyValueStore;
use crate::task::{TaskDraft, TaskPatch, TimeEntryDraft};
use crate::user::display_name;
use crate::workspace::Workspace;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with an email address and the shared passphrase.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out and forget the session.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// List known users.
    Users,

    /// List visible tasks with optional filters.
    List {
        /// Case-insensitive text to find in title, description or tags.
        #[arg(long)]
        search: Option<String>,
        /// Filter by status. May be repeated.
        #[arg(long, value_enum)]
        status: Vec<Status>,
        /// Filter by priority. May be repeated.
        #[arg(long, value_enum)]
        priority: Vec<Priority>,
        /// Filter by assignee user ID. May be repeated.
        #[arg(long)]
        assignee: Vec<u64>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::UpdatedAt)]
        sort: SortKey,
        /// Sort direction.
        #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
        order: SortOrder,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task.
    View {
        /// Task ID
        id: String,
    },

    /// Create a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Priority: low | medium | high | critical.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Assignee user ID. Defaults to yourself.
        #[arg(long)]
        assignee: Option<u64>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Edit fields on a task.
    Update {
        /// Task ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        assignee: Option<u64>,
        #[arg(long)]
        due: Option<String>,
        /// Clear due date.
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        /// Add tags. May be repeated and comma-separated.
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        /// Remove tags. May be repeated and comma-separated.
        #[arg(long = "rm-tag")]
        rm_tags: Vec<String>,
    },

    /// Start work on a task you are assigned.
    Start { id: String },

    /// Request approval for a task you are assigned.
    Submit { id: String },

    /// Approve and close a task awaiting approval (managers).
    Approve { id: String },

    /// Send a task awaiting approval back for more work (managers).
    Reject { id: String },

    /// Reopen a closed task (managers).
    Reopen { id: String },

    /// Delete a task.
    Delete { id: String },

    /// Log hours against a task you are assigned.
    Log {
        /// Task ID
        id: String,
        /// Hours worked, e.g. 1.5
        #[arg(allow_hyphen_values = true)]
        hours: f64,
        /// What the time was spent on.
        #[arg(long)]
        desc: Option<String>,
        /// Work date. Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Show status counts, the 7-day trend and recent activity.
    Dashboard,

    /// Show the time tracking overview.
    Time,

    /// List distinct tags and counts.
    Tags,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Sign in and persist the session.
pub fn cmd_login<S: KeyValueStore>(ws: &mut Workspace<S>, email: &str, password: &str) -> Result<()> {
    let user = ws.login(email, password)?;
    println!("Signed in as {} ({})", user.name, user.role);
    Ok(())
}

pub fn cmd_logout<S: KeyValueStore>(ws: &mut Workspace<S>) -> Result<()> {
    ws.logout()?;
    println!("Signed out");
    Ok(())
}

pub fn cmd_whoami<S: KeyValueStore>(ws: &Workspace<S>) -> Result<()> {
    let user = ws.require_user()?;
    println!("{} <{}> #{} ({})", user.name, user.email, user.id, user.role);
    Ok(())
}

pub fn cmd_users<S: KeyValueStore>(ws: &mut Workspace<S>) -> Result<()> {
    let users = ws.identity().users()?;
    println!("{:<5} {:<20} {:<24} {}", "ID", "Name", "Email", "Role");
    for u in users {
        println!("{:<5} {:<20} {:<24} {}", u.id, truncate(&u.name, 20), truncate(&u.email, 24), u.role);
    }
    Ok(())
}

/// List visible tasks with filtering and sorting.
pub fn cmd_list<S: KeyValueStore>(ws: &mut Workspace<S>, filter: &TaskFilter, limit: Option<usize>) -> Result<()> {
    let snap = ws.snapshot()?;
    let visible = snap.visible();
    let mut rows = filter.apply(&visible);
    if let Some(n) = limit {
        rows.truncate(n);
    }
    if filter.active_count() > 0 {
        println!("{} of {} tasks match {} filter(s)", rows.len(), visible.len(), filter.active_count());
    }
    print_table(&rows, &snap.users);
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_view<S: KeyValueStore>(ws: &mut Workspace<S>, id: &str) -> Result<()> {
    let task_id = parse_task_id(id)?;
    let snap = ws.snapshot()?;
    let task = snap
        .visible()
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| TrackerError::task_not_found(task_id))?;
    let today = today();
    let names = |id: u64| display_name(&snap.users, id);

    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", task.status);
    println!("Priority:     {}", task.priority);
    println!("Assignee:     {}", names(task.assignee_id));
    println!("Created by:   {}", names(task.created_by));
    println!(
        "Due:          {}",
        match task.due_date {
            Some(d) => format!("{d} ({})", format_due_relative(Some(d), today)),
            None => "-".into(),
        }
    );
    println!("Tags:         {}", if task.tags.is_empty() { "-".into() } else { task.tags.join(",") });
    println!("Created:      {}", task.created_at.to_rfc3339());
    println!("Updated:      {}", task.updated_at.to_rfc3339());
    if let Some(closed) = task.closed_at {
        println!("Closed:       {}", closed.to_rfc3339());
    }
    println!("Logged:       {}", format_hours(task.total_hours()));
    println!("Description:\n{}\n", if task.description.is_empty() { "-" } else { task.description.as_str() });

    if !task.time_entries.is_empty() {
        println!("Time entries:");
        for e in &task.time_entries {
            println!("  {} {:>6}  {:<16} {}", e.date, format_hours(e.hours), truncate(names(e.user_id), 16), e.description);
        }
    }
    if !task.comments.is_empty() {
        println!("Comments:");
        for c in &task.comments {
            println!("  {} {}: {}", c.created_at.format("%Y-%m-%d %H:%M"), names(c.user_id), c.content);
        }
    }

    let moves = available_transitions(&snap.viewer, task);
    if !moves.is_empty() {
        let moves: Vec<String> = moves.iter().map(Transition::to_string).collect();
        println!("You can:      {}", moves.join(", "));
    }
    Ok(())
}

/// Create a new task assigned to `assignee`, or to the caller.
pub fn cmd_add<S: KeyValueStore>(
    ws: &mut Workspace<S>,
    title: String,
    desc: Option<String>,
    priority: Priority,
    assignee: Option<u64>,
    due: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let me = ws.require_user()?.id;
    let mut draft = TaskDraft::new(title, assignee.unwrap_or(me), me);
    draft.description = desc.unwrap_or_default();
    draft.priority = priority;
    draft.due_date = due.as_deref().map(|d| require_date(d, today())).transpose()?;
    draft.tags = split_and_normalise_tags(&tags);

    let task = ws.lifecycle()?.create(draft)?;
    println!("Added task {}", task.id);
    Ok(())
}

/// Update an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update<S: KeyValueStore>(
    ws: &mut Workspace<S>,
    id: &str,
    title: Option<String>,
    desc: Option<String>,
    priority: Option<Priority>,
    assignee: Option<u64>,
    due: Option<String>,
    clear_due: bool,
    add_tags: Vec<String>,
    rm_tags: Vec<String>,
) -> Result<()> {
    let task_id = parse_task_id(id)?;
    let mut patch = TaskPatch {
        title,
        description: desc,
        priority,
        assignee_id: assignee,
        ..TaskPatch::default()
    };
    if clear_due {
        patch.due_date = Some(None);
    } else if let Some(d) = due {
        patch.due_date = Some(Some(require_date(&d, today())?));
    }

    let add = split_and_normalise_tags(&add_tags);
    let rm = split_and_normalise_tags(&rm_tags);
    if !add.is_empty() || !rm.is_empty() {
        let current = ws.tasks().get(task_id)?;
        let mut tags: Vec<String> = current.tags.into_iter().filter(|t| !rm.contains(t)).collect();
        for a in add {
            if !tags.contains(&a) {
                tags.push(a);
            }
        }
        patch.tags = Some(tags);
    }

    ws.lifecycle()?.edit(task_id, &patch)?;
    println!("Updated task {}", task_id);
    Ok(())
}

/// Apply a lifecycle transition.
pub fn cmd_transition<S: KeyValueStore>(ws: &mut Workspace<S>, id: &str, transition: Transition) -> Result<()> {
    let task_id = parse_task_id(id)?;
    let task = ws.lifecycle()?.apply(task_id, transition)?;
    println!("Task {} is now {}", task.id, task.status);
    Ok(())
}

pub fn cmd_delete<S: KeyValueStore>(ws: &mut Workspace<S>, id: &str) -> Result<()> {
    let task_id = parse_task_id(id)?;
    ws.lifecycle()?.delete(task_id)?;
    println!("Deleted task {}", task_id);
    Ok(())
}

/// Log hours on a task.
pub fn cmd_log<S: KeyValueStore>(
    ws: &mut Workspace<S>,
    id: &str,
    hours: f64,
    desc: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let task_id = parse_task_id(id)?;
    let date = match date {
        Some(d) => require_date(&d, today())?,
        None => today(),
    };
    let entry = ws.lifecycle()?.log_time(
        task_id,
        TimeEntryDraft {
            hours,
            date,
            description: desc.unwrap_or_default(),
        },
    )?;
    println!("{} logged for task {} on {}", format_hours(entry.hours), task_id, entry.date);
    Ok(())
}

/// Print dashboard statistics, the trend window and recent activity.
pub fn cmd_dashboard<S: KeyValueStore>(ws: &mut Workspace<S>) -> Result<()> {
    let snap = ws.snapshot()?;
    let visible = snap.visible();
    let stats = DashboardStats::compute(&visible);
    let scope = if snap.viewer.is_manager() { "team" } else { "tasks" };

    println!("Welcome back, {}! Here's what's happening with your {} today.\n", snap.viewer.first_name(), scope);
    println!(
        "Total {}  Open {}  In progress {}  Pending approval {}  Closed {}  Reopened {}  Logged {}\n",
        stats.total_tasks,
        stats.open_tasks,
        stats.in_progress_tasks,
        stats.pending_approval_tasks,
        stats.closed_tasks,
        stats.reopened_tasks,
        format_hours(stats.total_time_spent)
    );

    println!("{:<8} {:>7} {:>10} {:>7}", "Day", "Worked", "Completed", "Hours");
    for point in trend_series(&visible, today(), &Local) {
        println!(
            "{:<8} {:>7} {:>10} {:>7}",
            point.label(),
            point.tasks_worked,
            point.tasks_completed,
            format_hours(point.hours_spent)
        );
    }

    println!("\nRecent activity:");
    let recent = recent_tasks(&visible, RECENT_LIMIT);
    if recent.is_empty() {
        println!("  No recent tasks");
    }
    for t in recent {
        println!(
            "  #{:<4} {:<17} {:<9} {} (assigned to {})",
            t.id,
            t.status,
            t.priority,
            truncate(&t.title, 40),
            display_name(&snap.users, t.assignee_id)
        );
    }
    Ok(())
}

/// Print the time tracking overview.
pub fn cmd_time<S: KeyValueStore>(ws: &mut Workspace<S>) -> Result<()> {
    let snap = ws.snapshot()?;
    let visible = snap.visible();
    let summary = TimeSummary::compute(&visible, &snap.users);

    println!(
        "Total {}  Entries {}  Average {} per entry\n",
        format_hours(summary.total_hours),
        summary.total_entries(),
        format_hours(summary.average_hours())
    );

    println!("{:<20} {:>7} {:>8}", "User", "Hours", "Entries");
    for u in &summary.by_user {
        println!("{:<20} {:>7} {:>8}", truncate(&u.user_name, 20), format_hours(u.hours), u.entries);
    }

    println!("\n{:<5} {:<36} {:>7} {:>8}", "Task", "Title", "Hours", "Entries");
    for r in summary.top_tasks(10) {
        println!("{:<5} {:<36} {:>7} {:>8}", r.task.id, truncate(&r.task.title, 36), format_hours(r.hours), r.entries);
    }

    println!("\nRecent entries:");
    for l in summary.entries.iter().take(10) {
        println!(
            "  {} {:>6}  {:<16} #{} {}",
            l.entry.date,
            format_hours(l.entry.hours),
            truncate(l.user_name, 16),
            l.task.id,
            l.entry.description
        );
    }
    Ok(())
}

pub fn cmd_tags<S: KeyValueStore>(ws: &mut Workspace<S>) -> Result<()> {
    let snap = ws.snapshot()?;
    println!("{:<16} {}", "Tag", "Count");
    for (tag, c) in tag_counts(&snap.visible()) {
        println!("{:<16} {}", truncate(&tag, 16), c);
    }
    Ok(())
}

pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
