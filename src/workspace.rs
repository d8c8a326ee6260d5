//! The per-session context: one store plus the signed-in user.
//!
//! A `Workspace` is opened at startup (seeding the store if needed and picking up
//! any persisted session) and hands out the repository, identity and lifecycle
//! views over its store. Logging out clears both the persisted slot and the
//! in-memory user.

use tracing::info;

use crate::aggregate::visible_tasks;
use crate::db::TaskRepository;
use crate::error::{Result, TrackerError};
use crate::lifecycle::Lifecycle;
use crate::session::Identity;
use crate::store::KeyValueStore;
use crate::task::Task;
use crate::user::User;

pub struct Workspace<S> {
    store: S,
    user: Option<User>,
}

impl<S: KeyValueStore> Workspace<S> {
    /// Seed missing records and restore the persisted session, if any.
    pub fn open(mut store: S) -> Result<Self> {
        Identity::new(&mut store).seed()?;
        TaskRepository::new(&mut store).seed()?;
        let user = Identity::new(&mut store).session();
        Ok(Workspace { store, user })
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> Result<&User> {
        self.user.as_ref().ok_or(TrackerError::NotSignedIn)
    }

    pub fn identity(&mut self) -> Identity<&mut S> {
        Identity::new(&mut self.store)
    }

    pub fn tasks(&mut self) -> TaskRepository<&mut S> {
        TaskRepository::new(&mut self.store)
    }

    /// Mutation commands on behalf of the signed-in user.
    pub fn lifecycle(&mut self) -> Result<Lifecycle<'_, S>> {
        let actor = self.user.as_ref().ok_or(TrackerError::NotSignedIn)?;
        Ok(Lifecycle::new(&mut self.store, actor))
    }

    /// Authenticate and persist the session.
    pub fn login(&mut self, email: &str, passphrase: &str) -> Result<&User> {
        let mut identity = Identity::new(&mut self.store);
        let user = identity.authenticate(email, passphrase)?;
        identity.set_session(Some(&user))?;
        Ok(self.user.insert(user))
    }

    pub fn logout(&mut self) -> Result<()> {
        Identity::new(&mut self.store).set_session(None)?;
        if let Some(user) = self.user.take() {
            info!(user_id = user.id, "signed out");
        }
        Ok(())
    }

    /// Read everything a view needs in one go.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        let viewer = self.require_user()?.clone();
        let users = self.identity().users()?;
        let tasks = self.tasks().list()?;
        Ok(Snapshot { viewer, users, tasks })
    }
}

/// Point-in-time copy of the collections, taken for one signed-in viewer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub viewer: User,
    pub users: Vec<User>,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    /// Tasks the viewer's role lets them see.
    pub fn visible(&self) -> Vec<&Task> {
        visible_tasks(&self.tasks, &self.viewer)
    }
}
