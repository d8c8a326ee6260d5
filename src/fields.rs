//! Enumerations and field types for tasks and users.
//!
//! This module defines the structured values used to classify tasks and people:
//! user roles, task priorities, lifecycle statuses and list ordering options.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Role of a user, deciding which lifecycle moves they may make.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Developer,
    Manager,
}

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Fixed rank used for ordering: low(1) < medium(2) < high(3) < critical(4).
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }
}

/// Position of a task in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Open,
    InProgress,
    PendingApproval,
    Closed,
    Reopened,
}

impl Status {
    /// Statuses that count as actively worked on.
    pub fn is_worked(self) -> bool {
        matches!(self, Status::InProgress | Status::PendingApproval)
    }

    /// `reopened` behaves like `open` for the forward transitions.
    pub fn is_open_like(self) -> bool {
        matches!(self, Status::Open | Status::Reopened)
    }

    /// Stored, kebab-case name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in-progress",
            Status::PendingApproval => "pending-approval",
            Status::Closed => "closed",
            Status::Reopened => "reopened",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Role::Developer => "developer",
            Role::Manager => "manager",
        })
    }
}

/// Available sorting keys for task lists.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    #[default]
    UpdatedAt,
    Priority,
    DueDate,
}

/// Direction applied after sorting by a [`SortKey`].
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_is_not_lexicographic() {
        let mut ps = vec![Priority::Medium, Priority::Critical, Priority::Low, Priority::High];
        ps.sort_by_key(|p| p.rank());
        assert_eq!(ps, vec![Priority::Low, Priority::Medium, Priority::High, Priority::Critical]);
    }

    #[test]
    fn test_status_serialises_kebab_case() {
        let s = serde_json::to_string(&Status::PendingApproval).unwrap();
        assert_eq!(s, "\"pending-approval\"");
        let back: Status = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(back, Status::InProgress);
    }

    #[test]
    fn test_reopened_is_open_like() {
        assert!(Status::Reopened.is_open_like());
        assert!(Status::Open.is_open_like());
        assert!(!Status::Closed.is_open_like());
    }
}
