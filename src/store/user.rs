//! Provisioned user store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::StoreError;
use crate::model::User;

/// Storage interface for users, keyed by username.
pub trait UserStore: Send + Sync + 'static {
    /// Stores a copy of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the username is taken.
    fn save(&self, user: &User) -> Result<(), StoreError>;

    /// Returns a copy of the user, or `None`.
    fn find(&self, username: &str) -> Option<User>;
}

/// In-memory [`UserStore`].
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(StoreError::already_exists(&user.username));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    fn find(&self, username: &str) -> Option<User> {
        self.users.read().get(username).cloned()
    }
}
