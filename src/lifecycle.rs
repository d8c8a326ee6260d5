//! Task lifecycle: status transitions, who may perform them, and time logging.
//!
//! ```text
//! open ──start──▶ in-progress ──submit──▶ pending-approval ──approve──▶ closed
//!   ▲                                           │                         │
//!   └─ reopened ◀────────── reject ─────────────┘◀──────── reopen ────────┘
//! ```
//!
//! `reopened` accepts the same forward moves as `open`. Every check here runs
//! before anything is written, so a rejected command leaves the task as it was.

use std::fmt;

use chrono::Utc;
use tracing::info;

use crate::db::TaskRepository;
use crate::error::{Result, TrackerError};
use crate::fields::Status;
use crate::session::Identity;
use crate::store::KeyValueStore;
use crate::task::{Task, TaskDraft, TaskPatch, TimeEntry, TimeEntryDraft};
use crate::user::User;

/// A named status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// open/reopened → in-progress, by the assignee.
    Start,
    /// in-progress → pending-approval, by the assignee.
    Submit,
    /// pending-approval → closed, by any manager.
    Approve,
    /// pending-approval → reopened, by any manager.
    Reject,
    /// closed → reopened, by any manager.
    Reopen,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::Start,
        Transition::Submit,
        Transition::Approve,
        Transition::Reject,
        Transition::Reopen,
    ];

    pub fn target(self) -> Status {
        match self {
            Transition::Start => Status::InProgress,
            Transition::Submit => Status::PendingApproval,
            Transition::Approve => Status::Closed,
            Transition::Reject | Transition::Reopen => Status::Reopened,
        }
    }

    /// Whether the move exists from `from`, regardless of who asks.
    pub fn allowed_from(self, from: Status) -> bool {
        match self {
            Transition::Start => from.is_open_like(),
            Transition::Submit => from == Status::InProgress,
            Transition::Approve | Transition::Reject => from == Status::PendingApproval,
            Transition::Reopen => from == Status::Closed,
        }
    }

    /// Whether `actor` holds the role or relationship this move requires.
    pub fn permits(self, actor: &User, task: &Task) -> bool {
        match self {
            Transition::Start | Transition::Submit => task.assignee_id == actor.id,
            Transition::Approve | Transition::Reject | Transition::Reopen => actor.is_manager(),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Transition::Start => "start",
            Transition::Submit => "submit",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Reopen => "reopen",
        })
    }
}

/// Managers and the assignee may edit fields.
pub fn can_edit(actor: &User, task: &Task) -> bool {
    actor.is_manager() || task.assignee_id == actor.id
}

/// Managers and the creator may delete.
pub fn can_delete(actor: &User, task: &Task) -> bool {
    actor.is_manager() || task.created_by == actor.id
}

/// Only the assignee logs time.
pub fn can_log_time(actor: &User, task: &Task) -> bool {
    task.assignee_id == actor.id
}

/// Transitions `actor` could perform on `task` right now.
pub fn available_transitions(actor: &User, task: &Task) -> Vec<Transition> {
    Transition::ALL
        .into_iter()
        .filter(|t| t.allowed_from(task.status) && t.permits(actor, task))
        .collect()
}

/// Check a transition and return the status it leads to.
///
/// Authorization is checked before the current status.
pub fn check_transition(actor: &User, task: &Task, transition: Transition) -> Result<Status> {
    if !transition.permits(actor, task) {
        return Err(TrackerError::Authorization(format!(
            "{} may not {} task {}",
            actor.name, transition, task.id
        )));
    }
    if !transition.allowed_from(task.status) {
        return Err(TrackerError::InvalidTransition {
            from: task.status,
            transition,
        });
    }
    Ok(transition.target())
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TrackerError::Validation("title must not be empty".into()));
    }
    Ok(())
}

fn validate_hours(hours: f64) -> Result<()> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(TrackerError::Validation(format!(
            "hours must be a positive number, got {}",
            hours
        )));
    }
    Ok(())
}

/// Mutation commands issued by one signed-in user.
#[derive(Debug)]
pub struct Lifecycle<'a, S> {
    store: &'a mut S,
    actor: &'a User,
}

impl<'a, S: KeyValueStore> Lifecycle<'a, S> {
    pub fn new(store: &'a mut S, actor: &'a User) -> Self {
        Lifecycle { store, actor }
    }

    fn repo(&mut self) -> TaskRepository<&mut S> {
        TaskRepository::new(&mut *self.store)
    }

    fn require_user(&mut self, id: u64) -> Result<()> {
        let identity = Identity::new(&mut *self.store);
        if identity.find_user(id)?.is_none() {
            return Err(TrackerError::Validation(format!("no user with id {}", id)));
        }
        Ok(())
    }

    /// Create a task owned by the actor. New tasks always start `open`.
    pub fn create(&mut self, mut draft: TaskDraft) -> Result<Task> {
        validate_title(&draft.title)?;
        if draft.status != Status::Open {
            return Err(TrackerError::Validation(format!(
                "new tasks start open, not {}",
                draft.status
            )));
        }
        self.require_user(draft.assignee_id)?;
        draft.title = draft.title.trim().to_string();
        draft.created_by = self.actor.id;
        self.repo().create(draft)
    }

    /// Edit fields; allowed for managers and the assignee.
    pub fn edit(&mut self, id: u64, patch: &TaskPatch) -> Result<Task> {
        let task = self.repo().get(id)?;
        if !can_edit(self.actor, &task) {
            return Err(TrackerError::Authorization(format!(
                "{} may not edit task {}",
                self.actor.name, id
            )));
        }
        if patch.is_empty() {
            return Err(TrackerError::Validation("nothing to update".into()));
        }
        let mut patch = patch.clone();
        if let Some(title) = patch.title.as_mut() {
            validate_title(title)?;
            *title = title.trim().to_string();
        }
        if let Some(assignee) = patch.assignee_id {
            self.require_user(assignee)?;
        }
        let updated = self.repo().update(id, &patch)?;
        info!(task_id = id, actor = self.actor.id, "task edited");
        Ok(updated)
    }

    /// Perform a status transition with its side effects on `closed_at`.
    pub fn apply(&mut self, id: u64, transition: Transition) -> Result<Task> {
        let task = self.repo().get(id)?;
        let target = check_transition(self.actor, &task, transition)?;
        let now = Utc::now();
        let updated = self.repo().modify(id, |t| {
            t.status = target;
            t.closed_at = if target == Status::Closed { Some(now) } else { None };
        })?;
        info!(
            task_id = id,
            actor = self.actor.id,
            from = %task.status,
            to = %target,
            "task {}",
            transition
        );
        Ok(updated)
    }

    pub fn start(&mut self, id: u64) -> Result<Task> {
        self.apply(id, Transition::Start)
    }

    pub fn submit(&mut self, id: u64) -> Result<Task> {
        self.apply(id, Transition::Submit)
    }

    pub fn approve(&mut self, id: u64) -> Result<Task> {
        self.apply(id, Transition::Approve)
    }

    pub fn reject(&mut self, id: u64) -> Result<Task> {
        self.apply(id, Transition::Reject)
    }

    pub fn reopen(&mut self, id: u64) -> Result<Task> {
        self.apply(id, Transition::Reopen)
    }

    /// Delete outright; allowed for managers and the creator.
    pub fn delete(&mut self, id: u64) -> Result<()> {
        let task = self.repo().get(id)?;
        if !can_delete(self.actor, &task) {
            return Err(TrackerError::Authorization(format!(
                "{} may not delete task {}",
                self.actor.name, id
            )));
        }
        self.repo().delete(id)
    }

    /// Append a time entry logged by the assignee.
    pub fn log_time(&mut self, id: u64, draft: TimeEntryDraft) -> Result<TimeEntry> {
        validate_hours(draft.hours)?;
        let task = self.repo().get(id)?;
        if !can_log_time(self.actor, &task) {
            return Err(TrackerError::Authorization(format!(
                "only the assignee may log time on task {}",
                id
            )));
        }
        let entry = TimeEntry {
            id: task.next_entry_id(),
            task_id: id,
            user_id: self.actor.id,
            description: draft.description,
            hours: draft.hours,
            date: draft.date,
            created_at: Utc::now(),
        };
        let pushed = entry.clone();
        self.repo().modify(id, move |t| t.time_entries.push(pushed))?;
        info!(task_id = id, actor = self.actor.id, hours = entry.hours, "time logged");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Priority, Role};
    use crate::store::MemoryStore;
    use crate::user::default_users;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        TaskRepository::new(&mut store).seed().unwrap();
        Identity::new(&mut store).seed().unwrap();
        store
    }

    fn user(id: u64) -> User {
        default_users().into_iter().find(|u| u.id == id).unwrap()
    }

    fn john() -> User {
        user(1)
    }

    fn sarah() -> User {
        user(2)
    }

    fn mike() -> User {
        user(3)
    }

    fn stored(store: &mut MemoryStore, id: u64) -> Task {
        TaskRepository::new(store).get(id).unwrap()
    }

    fn entry(hours: f64) -> TimeEntryDraft {
        TimeEntryDraft {
            hours,
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            description: "work".into(),
        }
    }

    #[test]
    fn test_full_lifecycle_to_closed() {
        let mut store = seeded();
        let (mike, sarah) = (mike(), sarah());

        let t = Lifecycle::new(&mut store, &mike).start(2).unwrap();
        assert_eq!(t.status, Status::InProgress);
        let t = Lifecycle::new(&mut store, &mike).submit(2).unwrap();
        assert_eq!(t.status, Status::PendingApproval);
        assert!(t.closed_at.is_none());
        let t = Lifecycle::new(&mut store, &sarah).approve(2).unwrap();
        assert_eq!(t.status, Status::Closed);
        assert!(t.closed_at.is_some());
        assert!(t.updated_at >= t.created_at);
    }

    #[test]
    fn test_non_assignee_cannot_start() {
        let mut store = seeded();
        let john = john();
        let before = stored(&mut store, 2);

        let res = Lifecycle::new(&mut store, &john).start(2);

        assert_matches!(res, Err(TrackerError::Authorization(_)));
        assert_eq!(stored(&mut store, 2), before);
    }

    #[test]
    fn test_manager_cannot_start_unassigned_task() {
        let mut store = seeded();
        let sarah = sarah();
        assert_matches!(
            Lifecycle::new(&mut store, &sarah).start(2),
            Err(TrackerError::Authorization(_))
        );
    }

    #[test]
    fn test_developer_cannot_approve() {
        let mut store = seeded();
        let john = john();
        Lifecycle::new(&mut store, &john).submit(1).unwrap();
        let before = stored(&mut store, 1);
        assert_matches!(
            Lifecycle::new(&mut store, &john).approve(1),
            Err(TrackerError::Authorization(_))
        );
        assert_eq!(stored(&mut store, 1), before);
    }

    #[test]
    fn test_wrong_source_status_is_rejected() {
        let mut store = seeded();
        let (mike, sarah) = (mike(), sarah());
        assert_matches!(
            Lifecycle::new(&mut store, &mike).submit(2),
            Err(TrackerError::InvalidTransition { from: Status::Open, transition: Transition::Submit })
        );
        assert_matches!(
            Lifecycle::new(&mut store, &sarah).approve(2),
            Err(TrackerError::InvalidTransition { .. })
        );
        assert_eq!(stored(&mut store, 2).status, Status::Open);
    }

    #[test]
    fn test_reject_then_restart() {
        let mut store = seeded();
        let (john, sarah) = (john(), sarah());
        Lifecycle::new(&mut store, &john).submit(1).unwrap();
        let t = Lifecycle::new(&mut store, &sarah).reject(1).unwrap();
        assert_eq!(t.status, Status::Reopened);
        assert!(t.closed_at.is_none());
        let t = Lifecycle::new(&mut store, &john).start(1).unwrap();
        assert_eq!(t.status, Status::InProgress);
    }

    #[test]
    fn test_reopen_clears_closed_at() {
        let mut store = seeded();
        let (john, sarah) = (john(), sarah());
        Lifecycle::new(&mut store, &john).submit(1).unwrap();
        Lifecycle::new(&mut store, &sarah).approve(1).unwrap();
        let t = Lifecycle::new(&mut store, &sarah).reopen(1).unwrap();
        assert_eq!(t.status, Status::Reopened);
        assert!(t.closed_at.is_none());
    }

    #[test]
    fn test_log_time_appends_entry() {
        let mut store = seeded();
        let john = john();
        let before = stored(&mut store, 1);
        let e = Lifecycle::new(&mut store, &john).log_time(1, entry(1.5)).unwrap();
        let after = stored(&mut store, 1);
        assert_eq!(e.id, 2);
        assert_eq!(e.task_id, 1);
        assert_eq!(e.user_id, 1);
        assert_eq!(after.time_entries.len(), 2);
        assert_eq!(after.total_hours(), 4.0);
        assert!(after.updated_at > before.updated_at);
    }

    #[test]
    fn test_log_time_rejects_non_positive_hours() {
        let mut store = seeded();
        let john = john();
        for hours in [0.0, -1.0, f64::NAN] {
            let res = Lifecycle::new(&mut store, &john).log_time(1, entry(hours));
            assert_matches!(res, Err(TrackerError::Validation(_)));
        }
        assert_eq!(stored(&mut store, 1).time_entries.len(), 1);
    }

    #[test]
    fn test_only_assignee_logs_time() {
        let mut store = seeded();
        let sarah = sarah();
        assert_matches!(
            Lifecycle::new(&mut store, &sarah).log_time(1, entry(1.0)),
            Err(TrackerError::Authorization(_))
        );
    }

    #[test]
    fn test_create_sets_creator_and_validates() {
        let mut store = seeded();
        let john = john();
        let mut lc = Lifecycle::new(&mut store, &john);

        let t = lc.create(TaskDraft::new("  Broken link  ", 3, 99)).unwrap();
        assert_eq!(t.created_by, 1);
        assert_eq!(t.title, "Broken link");
        assert_eq!(t.status, Status::Open);

        assert_matches!(lc.create(TaskDraft::new("   ", 3, 1)), Err(TrackerError::Validation(_)));
        assert_matches!(lc.create(TaskDraft::new("x", 42, 1)), Err(TrackerError::Validation(_)));
        let mut closed = TaskDraft::new("x", 3, 1);
        closed.status = Status::Closed;
        assert_matches!(lc.create(closed), Err(TrackerError::Validation(_)));
    }

    #[test]
    fn test_edit_permissions_and_validation() {
        let mut store = seeded();
        let (john, sarah, mike) = (john(), sarah(), mike());
        let patch = TaskPatch {
            priority: Some(Priority::Critical),
            ..TaskPatch::default()
        };
        assert_matches!(
            Lifecycle::new(&mut store, &john).edit(2, &patch),
            Err(TrackerError::Authorization(_))
        );
        assert_eq!(Lifecycle::new(&mut store, &mike).edit(2, &patch).unwrap().priority, Priority::Critical);
        assert!(Lifecycle::new(&mut store, &sarah).edit(1, &patch).is_ok());

        let empty_title = TaskPatch {
            title: Some(String::new()),
            ..TaskPatch::default()
        };
        let before = stored(&mut store, 2);
        assert_matches!(
            Lifecycle::new(&mut store, &mike).edit(2, &empty_title),
            Err(TrackerError::Validation(_))
        );
        assert_eq!(stored(&mut store, 2), before);
    }

    #[test]
    fn test_edit_trims_title() {
        let mut store = seeded();
        let mike = mike();
        let patch = TaskPatch {
            title: Some("  Tighten the date parser  ".into()),
            ..TaskPatch::default()
        };
        let updated = Lifecycle::new(&mut store, &mike).edit(2, &patch).unwrap();
        assert_eq!(updated.title, "Tighten the date parser");
        assert_eq!(stored(&mut store, 2).title, "Tighten the date parser");
    }

    #[test]
    fn test_empty_edit_is_rejected_without_touching_task() {
        let mut store = seeded();
        let mike = mike();
        let before = stored(&mut store, 2);
        assert_matches!(
            Lifecycle::new(&mut store, &mike).edit(2, &TaskPatch::default()),
            Err(TrackerError::Validation(_))
        );
        assert_eq!(stored(&mut store, 2), before);
    }

    #[test]
    fn test_delete_permissions() {
        let mut store = seeded();
        let (john, sarah) = (john(), sarah());
        let own = Lifecycle::new(&mut store, &john).create(TaskDraft::new("mine", 3, 1)).unwrap();

        assert_matches!(
            Lifecycle::new(&mut store, &john).delete(2),
            Err(TrackerError::Authorization(_))
        );
        Lifecycle::new(&mut store, &john).delete(own.id).unwrap();
        Lifecycle::new(&mut store, &sarah).delete(2).unwrap();
        assert_matches!(
            Lifecycle::new(&mut store, &sarah).delete(2),
            Err(TrackerError::NotFound { .. })
        );
    }

    #[test]
    fn test_available_transitions_per_actor() {
        let mut store = seeded();
        let (john, sarah) = (john(), sarah());
        let task = stored(&mut store, 1);
        assert_eq!(available_transitions(&john, &task), vec![Transition::Submit]);
        assert!(available_transitions(&sarah, &task).is_empty());

        let mut pending = task.clone();
        pending.status = Status::PendingApproval;
        assert_eq!(
            available_transitions(&sarah, &pending),
            vec![Transition::Approve, Transition::Reject]
        );

        let stranger = User {
            id: 9,
            name: "Temp".into(),
            email: "t@example.com".into(),
            role: Role::Developer,
            avatar: None,
        };
        assert!(!can_edit(&stranger, &task));
        assert!(!can_delete(&stranger, &task));
    }
}
