//! Task data structures and related functionality.
//!
//! This module defines the `Task` record with its time entries and comments,
//! plus the draft and patch shapes used to create and edit tasks.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A unit of tracked work moving through the approval lifecycle.
///
/// `updated_at` never precedes `created_at`, and `closed_at` is only set while
/// the task sits in `closed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub assignee_id: u64,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub time_entries: Vec<TimeEntry>,
}

impl Task {
    /// Sum of logged hours; always derived from the entries.
    pub fn total_hours(&self) -> f64 {
        self.time_entries.iter().map(|e| e.hours).sum()
    }

    /// Past its due date and not yet closed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != Status::Closed && self.due_date.is_some_and(|d| d < today)
    }

    pub(crate) fn next_entry_id(&self) -> u64 {
        self.time_entries.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }
}

/// Hours logged by one user against one task on a given work date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: u64,
    pub task_id: u64,
    pub user_id: u64,
    #[serde(default)]
    pub description: String,
    pub hours: f64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Discussion note attached to a task. Stored and displayed, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub task_id: u64,
    pub user_id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields of a new task. The repository assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub assignee_id: u64,
    pub created_by: u64,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, assignee_id: u64, created_by: u64) -> Self {
        TaskDraft {
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            status: Status::Open,
            assignee_id,
            created_by,
            due_date: None,
            tags: Vec::new(),
        }
    }
}

/// Partial update of the editable task fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<u64>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(desc) = &self.description {
            task.description = desc.clone();
        }
        if let Some(p) = self.priority {
            task.priority = p;
        }
        if let Some(a) = self.assignee_id {
            task.assignee_id = a;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
    }
}

/// Caller-supplied part of a time entry; id, task and log timestamp are assigned on append.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntryDraft {
    pub hours: f64,
    pub date: NaiveDate,
    pub description: String,
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// The two sample tasks written to a fresh store.
pub fn default_tasks() -> Vec<Task> {
    vec![
        Task {
            id: 1,
            title: "Fix login validation bug".into(),
            description: "The login form is not properly validating email format".into(),
            priority: Priority::High,
            status: Status::InProgress,
            assignee_id: 1,
            created_by: 2,
            created_at: at(2024, 1, 15, 10, 0),
            updated_at: at(2024, 1, 15, 14, 30),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 20),
            closed_at: None,
            tags: vec!["bug".into(), "authentication".into()],
            comments: Vec::new(),
            time_entries: vec![TimeEntry {
                id: 1,
                task_id: 1,
                user_id: 1,
                description: "Investigating validation logic".into(),
                hours: 2.5,
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
                created_at: at(2024, 1, 15, 14, 30),
            }],
        },
        Task {
            id: 2,
            title: "Implement dark mode toggle".into(),
            description: "Add dark mode support throughout the application".into(),
            priority: Priority::Medium,
            status: Status::Open,
            assignee_id: 3,
            created_by: 2,
            created_at: at(2024, 1, 14, 9, 0),
            updated_at: at(2024, 1, 14, 9, 0),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 25),
            closed_at: None,
            tags: vec!["feature".into(), "ui".into()],
            comments: Vec::new(),
            time_entries: Vec::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_hours_sums_entries() {
        let tasks = default_tasks();
        assert_eq!(tasks[0].total_hours(), 2.5);
        assert_eq!(tasks[1].total_hours(), 0.0);
    }

    #[test]
    fn test_overdue_ignores_closed_tasks() {
        let mut task = default_tasks().remove(1);
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(task.is_overdue(today));
        task.status = Status::Closed;
        assert!(!task.is_overdue(today));
        task.status = Status::Open;
        task.due_date = None;
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn test_patch_clears_due_date_and_keeps_other_fields() {
        let mut task = default_tasks().remove(1);
        let patch = TaskPatch {
            due_date: Some(None),
            priority: Some(Priority::Critical),
            ..TaskPatch::default()
        };
        patch.apply(&mut task);
        assert_eq!(task.due_date, None);
        assert_eq!(task.priority, Priority::Critical);
        assert_eq!(task.title, "Implement dark mode toggle");
        assert!(TaskPatch::default().is_empty());
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_task_json_uses_camel_case_layout() {
        let task = default_tasks().remove(0);
        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(v["assigneeId"], 1);
        assert_eq!(v["status"], "in-progress");
        assert_eq!(v["timeEntries"][0]["date"], "2024-01-15");
        assert!(v.get("closedAt").is_none());
        let back: Task = serde_json::from_value(v).unwrap();
        assert_eq!(back, task);
    }
}
