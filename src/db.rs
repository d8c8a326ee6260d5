//! Task repository and utility functions for parsing and formatting.
//!
//! This module provides the `TaskRepository`, which keeps the whole task
//! collection as one record in a key-value store and rewrites it on every
//! mutation, along with helpers for tags, date input and table output.

use chrono::{DateTime, Days, Duration, Local, NaiveDate, Utc};
use tracing::{debug, info};

use crate::error::{Result, StoreError, TrackerError};
use crate::store::{KeyValueStore, TASKS_KEY};
use crate::task::{default_tasks, Task, TaskDraft, TaskPatch};
use crate::user::{display_name, User};

/// CRUD over the task collection.
///
/// Each mutation loads the full collection, changes it and writes it back.
/// Nothing guards against another process writing in between.
pub struct TaskRepository<S> {
    store: S,
}

impl<S: KeyValueStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        TaskRepository { store }
    }

    /// Write the sample tasks if the store has no `tasks` record yet.
    pub fn seed(&mut self) -> Result<()> {
        if self.store.get(TASKS_KEY)?.is_none() {
            self.save(&default_tasks())?;
            debug!("seeded sample tasks");
        }
        Ok(())
    }

    /// All tasks in stored order; the sample set when none are stored.
    pub fn list(&self) -> Result<Vec<Task>> {
        match self.store.get(TASKS_KEY)? {
            Some(v) => Ok(serde_json::from_value(v).map_err(StoreError::from)?),
            None => Ok(default_tasks()),
        }
    }

    pub fn get(&self, id: u64) -> Result<Task> {
        self.list()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TrackerError::task_not_found(id))
    }

    /// Append a new task with a fresh id and `created_at == updated_at == now`.
    pub fn create(&mut self, draft: TaskDraft) -> Result<Task> {
        let mut tasks = self.list()?;
        let now = Utc::now();
        let task = Task {
            id: next_id(&tasks),
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: draft.status,
            assignee_id: draft.assignee_id,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
            due_date: draft.due_date,
            closed_at: None,
            tags: draft.tags,
            comments: Vec::new(),
            time_entries: Vec::new(),
        };
        tasks.push(task.clone());
        self.save(&tasks)?;
        info!(task_id = task.id, "task created");
        Ok(task)
    }

    /// Apply a partial field update.
    pub fn update(&mut self, id: u64, patch: &TaskPatch) -> Result<Task> {
        self.modify(id, |t| patch.apply(t))
    }

    /// Run `f` against the stored task, bump `updated_at` and persist.
    pub fn modify<F>(&mut self, id: u64, f: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.list()?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Err(TrackerError::task_not_found(id));
        };
        f(task);
        touch(task, Utc::now());
        let updated = task.clone();
        self.save(&tasks)?;
        debug!(task_id = id, "task saved");
        Ok(updated)
    }

    /// Remove the task outright.
    pub fn delete(&mut self, id: u64) -> Result<()> {
        let mut tasks = self.list()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(TrackerError::task_not_found(id));
        }
        self.save(&tasks)?;
        info!(task_id = id, "task deleted");
        Ok(())
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        let v = serde_json::to_value(tasks).map_err(StoreError::from)?;
        self.store.set(TASKS_KEY, v)?;
        Ok(())
    }
}

/// Generate the next available task id.
pub fn next_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

/// Move `updated_at` forward to `now`, never backwards.
pub fn touch(task: &mut Task, now: DateTime<Utc>) {
    task.updated_at = task.updated_at.max(now).max(task.created_at);
}

/// Normalize a tag string by trimming, lowercasing, and replacing spaces with hyphens.
pub fn normalise_tag(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated tag strings and normalize each tag.
pub fn split_and_normalise_tags(inputs: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let tag = normalise_tag(part);
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Parse a calendar date typed by a person.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    // Offsets count forward only; out-of-range results are unparseable.
    if let Some(rest) = s.strip_prefix("in ") {
        let days = if let Some(nd) = rest.strip_suffix('d') {
            nd.trim().parse::<u64>().ok()
        } else if let Some(nw) = rest.strip_suffix('w') {
            nw.trim().parse::<u64>().ok().and_then(|w| w.checked_mul(7))
        } else {
            None
        };
        return days.and_then(|n| today.checked_add_days(Days::new(n)));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Like [`parse_date_input`], but an unparseable date is a validation failure.
pub fn require_date(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    parse_date_input(s, today)
        .ok_or_else(|| TrackerError::Validation(format!("unparseable date '{}'", s.trim())))
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {}d", delta)
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

/// Format an hour total with one decimal place, e.g. "2.5h".
pub fn format_hours(hours: f64) -> String {
    format!("{:.1}h", hours)
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task], users: &[User]) {
    println!(
        "{:<5} {:<17} {:<9} {:<16} {:<10} {:>7}  {}",
        "ID", "Status", "Priority", "Assignee", "Due", "Logged", "Title [tags]"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.tags.join(","))
        };
        let mut due = format_due_relative(t.due_date, today);
        if t.is_overdue(today) {
            due.push('!');
        }
        println!(
            "{:<5} {:<17} {:<9} {:<16} {:<10} {:>7}  {}{}",
            t.id,
            t.status,
            t.priority,
            truncate(display_name(users, t.assignee_id), 16),
            due,
            format_hours(t.total_hours()),
            t.title,
            tags
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Parse a task id typed on the command line.
pub fn parse_task_id(identifier: &str) -> Result<u64> {
    identifier
        .trim()
        .trim_start_matches('#')
        .parse::<u64>()
        .map_err(|_| TrackerError::Validation(format!("'{}' is not a task id", identifier)))
}
