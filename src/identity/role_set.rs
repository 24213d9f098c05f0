//! Concurrent role set
//!
//! A string set guarded by a reader-writer lock. Reads (`contains`, `len`,
//! `snapshot`) take the shared lock; mutations (`add`, `remove`) take the
//! exclusive lock. `snapshot` copies the contents out before returning, so
//! callers never iterate while the lock is held.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe set of role names.
#[derive(Debug, Default)]
pub struct RoleSet {
    inner: RwLock<HashSet<String>>,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set pre-populated with the given roles.
    pub fn from_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: RwLock::new(roles.into_iter().map(Into::into).collect()),
        }
    }

    // A panicked writer must not wedge the set for every later caller;
    // HashSet insert/remove leave the set usable even if interrupted.
    fn read(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a role. Returns `true` if it was not present before.
    pub fn add(&self, role: &str) -> bool {
        self.write().insert(role.to_string())
    }

    /// Remove a role. Returns `true` if it was present.
    pub fn remove(&self, role: &str) -> bool {
        self.write().remove(role)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.read().contains(role)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy the current contents into a sorted `Vec`.
    ///
    /// The lock is released before the copy is returned; later mutations do
    /// not affect an already-taken snapshot.
    pub fn snapshot(&self) -> Vec<String> {
        let mut roles: Vec<String> = {
            let guard = self.read();
            guard.iter().cloned().collect()
        };
        roles.sort_unstable();
        roles
    }
}
