//! User records and the default catalog seeded into a fresh store.

use serde::{Deserialize, Serialize};

use crate::fields::Role;

/// An identity that can sign in, own tasks and log time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// First word of the display name, used in greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Catalog written to the store when no `users` record exists yet.
pub fn default_users() -> Vec<User> {
    vec![
        User {
            id: 1,
            name: "John Developer".into(),
            email: "john@example.com".into(),
            role: Role::Developer,
            avatar: None,
        },
        User {
            id: 2,
            name: "Sarah Manager".into(),
            email: "sarah@example.com".into(),
            role: Role::Manager,
            avatar: None,
        },
        User {
            id: 3,
            name: "Mike Developer".into(),
            email: "mike@example.com".into(),
            role: Role::Developer,
            avatar: None,
        },
    ]
}

/// Resolve a user id to a display name, degrading to "Unknown User".
pub fn display_name(users: &[User], id: u64) -> &str {
    users
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.name.as_str())
        .unwrap_or("Unknown User")
}
