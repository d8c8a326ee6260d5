//! Derived views over the task collection: dashboard counts, the 7-day trend,
//! the filter/sort pipeline behind task lists, and time-tracking rollups.
//!
//! Everything here is a pure function of its inputs and is recomputed on every
//! read; nothing is cached on the tasks themselves.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, TimeZone};
use serde::Serialize;

use crate::fields::*;
use crate::task::{Task, TimeEntry};
use crate::user::{display_name, User};

/// Length of the trailing trend window, today included.
pub const TREND_DAYS: i64 = 7;

/// Number of tasks shown in the recent-activity list.
pub const RECENT_LIMIT: usize = 5;

/// Tasks the viewer may see: managers see everything, developers their own assignments.
pub fn visible_tasks<'a>(tasks: &'a [Task], viewer: &User) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| viewer.is_manager() || t.assignee_id == viewer.id)
        .collect()
}

/// Status counts and logged hours for the dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub open_tasks: usize,
    pub in_progress_tasks: usize,
    pub pending_approval_tasks: usize,
    pub closed_tasks: usize,
    pub reopened_tasks: usize,
    pub total_time_spent: f64,
}

impl DashboardStats {
    pub fn compute(tasks: &[&Task]) -> Self {
        let mut stats = DashboardStats {
            total_tasks: tasks.len(),
            ..DashboardStats::default()
        };
        for t in tasks {
            match t.status {
                Status::Open => stats.open_tasks += 1,
                Status::InProgress => stats.in_progress_tasks += 1,
                Status::PendingApproval => stats.pending_approval_tasks += 1,
                Status::Closed => stats.closed_tasks += 1,
                Status::Reopened => stats.reopened_tasks += 1,
            }
            stats.total_time_spent += t.total_hours();
        }
        stats
    }
}

/// Activity on one calendar day of the trend window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub tasks_worked: usize,
    pub tasks_completed: usize,
    pub hours_spent: f64,
}

impl TrendPoint {
    /// Short chart label, e.g. "Jun 10".
    pub fn label(&self) -> String {
        self.date.format("%b %d").to_string()
    }
}

/// One point per day for the trailing [`TREND_DAYS`] days ending at `today`, oldest first.
///
/// The worked/completed counts only consider tasks whose `updated_at` falls on
/// the day (in `tz`) and use their current status. Hours sum every entry dated
/// that day across all of `tasks`, whether or not the task was updated that day.
pub fn trend_series<Tz: TimeZone>(tasks: &[&Task], today: NaiveDate, tz: &Tz) -> Vec<TrendPoint> {
    let updated_on: Vec<(NaiveDate, &Task)> = tasks
        .iter()
        .map(|t| (t.updated_at.with_timezone(tz).date_naive(), *t))
        .collect();

    (0..TREND_DAYS)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back);
            let mut point = TrendPoint {
                date: day,
                tasks_worked: 0,
                tasks_completed: 0,
                hours_spent: 0.0,
            };
            for (_, t) in updated_on.iter().filter(|(d, _)| *d == day) {
                if t.status.is_worked() {
                    point.tasks_worked += 1;
                } else if t.status == Status::Closed {
                    point.tasks_completed += 1;
                }
            }
            point.hours_spent = tasks
                .iter()
                .flat_map(|t| t.time_entries.iter())
                .filter(|e| e.date == day)
                .map(|e| e.hours)
                .sum();
            point
        })
        .collect()
}

/// The most recently updated tasks, newest first.
pub fn recent_tasks<'a>(tasks: &[&'a Task], limit: usize) -> Vec<&'a Task> {
    let mut recent = tasks.to_vec();
    recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    recent.truncate(limit);
    recent
}

/// Distinct tags with the number of tasks carrying each.
pub fn tag_counts(tasks: &[&Task]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in tasks {
        for tag in &t.tags {
            *counts.entry(tag.clone()).or_default() += 1;
        }
    }
    counts
}

/// Search, filter and ordering options for a task list.
///
/// Empty sets mean "any". The default order is most recently updated first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub search: Option<String>,
    pub statuses: Vec<Status>,
    pub priorities: Vec<Priority>,
    pub assignees: Vec<u64>,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

impl TaskFilter {
    /// Number of active criteria, not counting ordering.
    pub fn active_count(&self) -> usize {
        self.statuses.len()
            + self.priorities.len()
            + self.assignees.len()
            + usize::from(self.search.as_deref().is_some_and(|s| !s.is_empty()))
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(term) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let term = term.to_lowercase();
            let hit = task.title.to_lowercase().contains(&term)
                || task.description.to_lowercase().contains(&term)
                || task.tags.iter().any(|tag| tag.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if !self.assignees.is_empty() && !self.assignees.contains(&task.assignee_id) {
            return false;
        }
        true
    }

    /// Filter then sort. Ties keep their input order in either direction.
    pub fn apply<'a>(&self, tasks: &[&'a Task]) -> Vec<&'a Task> {
        let mut out: Vec<&Task> = tasks.iter().copied().filter(|t| self.matches(t)).collect();
        out.sort_by(|a, b| {
            let ord = compare_by(self.sort_by, a, b);
            match self.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        out
    }
}

/// Ascending comparison on one sort key. A missing due date sorts as the epoch.
pub fn compare_by(key: SortKey, a: &Task, b: &Task) -> Ordering {
    match key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortKey::DueDate => {
            let epoch = NaiveDate::default();
            a.due_date.unwrap_or(epoch).cmp(&b.due_date.unwrap_or(epoch))
        }
    }
}

/// A time entry joined with its task and the logging user's name.
#[derive(Debug, Clone)]
pub struct LoggedEntry<'a> {
    pub entry: &'a TimeEntry,
    pub task: &'a Task,
    pub user_name: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRollup {
    pub user_id: u64,
    pub user_name: String,
    pub hours: f64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct TaskRollup<'a> {
    pub task: &'a Task,
    pub hours: f64,
    pub entries: usize,
}

/// Time-tracking overview for a set of visible tasks.
#[derive(Debug, Clone)]
pub struct TimeSummary<'a> {
    /// Every entry, newest logged first.
    pub entries: Vec<LoggedEntry<'a>>,
    pub total_hours: f64,
    /// Per logging user, in order of first appearance in `entries`.
    pub by_user: Vec<UserRollup>,
    /// Per task, in order of first appearance in `entries`.
    pub by_task: Vec<TaskRollup<'a>>,
}

impl<'a> TimeSummary<'a> {
    pub fn compute(tasks: &[&'a Task], users: &'a [User]) -> Self {
        let mut entries: Vec<LoggedEntry<'a>> = tasks
            .iter()
            .flat_map(|&task| {
                task.time_entries.iter().map(move |entry| LoggedEntry {
                    entry,
                    task,
                    user_name: display_name(users, entry.user_id),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.entry.created_at.cmp(&a.entry.created_at));

        let mut by_user: Vec<UserRollup> = Vec::new();
        let mut user_index: HashMap<u64, usize> = HashMap::new();
        let mut by_task: Vec<TaskRollup<'a>> = Vec::new();
        let mut task_index: HashMap<u64, usize> = HashMap::new();

        for logged in &entries {
            let e = logged.entry;
            let ui = *user_index.entry(e.user_id).or_insert_with(|| {
                by_user.push(UserRollup {
                    user_id: e.user_id,
                    user_name: logged.user_name.to_string(),
                    hours: 0.0,
                    entries: 0,
                });
                by_user.len() - 1
            });
            by_user[ui].hours += e.hours;
            by_user[ui].entries += 1;

            let ti = *task_index.entry(logged.task.id).or_insert_with(|| {
                by_task.push(TaskRollup {
                    task: logged.task,
                    hours: 0.0,
                    entries: 0,
                });
                by_task.len() - 1
            });
            by_task[ti].hours += e.hours;
            by_task[ti].entries += 1;
        }

        let total_hours = entries.iter().map(|l| l.entry.hours).sum();
        TimeSummary {
            entries,
            total_hours,
            by_user,
            by_task,
        }
    }

    pub fn total_entries(&self) -> usize {
        self.entries.len()
    }

    /// Mean hours per entry; zero when nothing has been logged.
    pub fn average_hours(&self) -> f64 {
        if self.entries.is_empty() {
            0.0
        } else {
            self.total_hours / self.entries.len() as f64
        }
    }

    /// Per-task rollups with the most hours first, at most `limit` of them.
    pub fn top_tasks(&self, limit: usize) -> Vec<&TaskRollup<'a>> {
        let mut ranked: Vec<&TaskRollup<'a>> = self.by_task.iter().collect();
        ranked.sort_by(|a, b| b.hours.total_cmp(&a.hours));
        ranked.truncate(limit);
        ranked
    }
}
