//! Identity catalog and the persisted "current user" slot.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError, TrackerError};
use crate::store::{KeyValueStore, CURRENT_USER_KEY, USERS_KEY};
use crate::user::{default_users, User};

/// Passphrase shared by every account.
pub const SHARED_PASSPHRASE: &str = "password123";

/// User lookups, sign-in and session persistence over a key-value store.
pub struct Identity<S> {
    store: S,
}

impl<S: KeyValueStore> Identity<S> {
    pub fn new(store: S) -> Self {
        Identity { store }
    }

    /// Write the default catalog if the store has no `users` record yet.
    pub fn seed(&mut self) -> Result<()> {
        if self.store.get(USERS_KEY)?.is_none() {
            let users = serde_json::to_value(default_users()).map_err(StoreError::from)?;
            self.store.set(USERS_KEY, users)?;
            debug!("seeded default user catalog");
        }
        Ok(())
    }

    /// All known users; the default catalog when none are stored.
    pub fn users(&self) -> Result<Vec<User>> {
        match self.store.get(USERS_KEY)? {
            Some(v) => Ok(serde_json::from_value(v).map_err(StoreError::from)?),
            None => Ok(default_users()),
        }
    }

    pub fn find_user(&self, id: u64) -> Result<Option<User>> {
        Ok(self.users()?.into_iter().find(|u| u.id == id))
    }

    /// Look up a user by exact email and check the shared passphrase.
    ///
    /// Unknown email and wrong passphrase produce the same error.
    pub fn authenticate(&self, email: &str, passphrase: &str) -> Result<User> {
        let user = self.users()?.into_iter().find(|u| u.email == email);
        match user {
            Some(user) if passphrase == SHARED_PASSPHRASE => {
                info!(user_id = user.id, "authenticated");
                Ok(user)
            }
            _ => {
                info!("authentication rejected");
                Err(TrackerError::Authentication)
            }
        }
    }

    /// The persisted session user. Missing or unreadable data means no session.
    pub fn session(&self) -> Option<User> {
        let value = match self.store.get(CURRENT_USER_KEY) {
            Ok(Some(Value::Null)) | Ok(None) => return None,
            Ok(Some(v)) => v,
            Err(e) => {
                warn!(error = %e, "could not read session, treating as signed out");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "discarding malformed session record");
                None
            }
        }
    }

    /// Persist `user` as the session, or clear the slot with `None`.
    pub fn set_session(&mut self, user: Option<&User>) -> Result<()> {
        match user {
            Some(user) => {
                let v = serde_json::to_value(user).map_err(StoreError::from)?;
                self.store.set(CURRENT_USER_KEY, v)?;
            }
            None => self.store.remove(CURRENT_USER_KEY)?,
        }
        Ok(())
    }
}
