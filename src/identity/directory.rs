//! In-memory identity directory
//!
//! Users live in two concurrent maps: username to password hash and
//! username to role set. The maps are sharded, so operations on different
//! usernames proceed in parallel; operations on the same username serialize
//! on its shard.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::password::hash_password;
use super::role_set::RoleSet;

/// Role granted to every registered user.
pub const DEFAULT_ROLE: &str = "User";

/// Role required for administrative endpoints.
pub const ADMIN_ROLE: &str = "Admin";

/// Concurrent user/role store.
///
/// The store is instance-based: construct one and share it behind an `Arc`.
/// Missing users are never an error here; lookups return `false` or empty
/// and mutations quietly do nothing.
pub struct IdentityDirectory {
    users: DashMap<String, String>,
    user_roles: DashMap<String, Arc<RoleSet>>,
}

impl IdentityDirectory {
    /// Create a directory seeded with the default `Admin`/`123` account.
    pub fn new() -> Self {
        Self::with_admin("Admin", "123")
    }

    /// Create a directory seeded with an administrator account holding the
    /// `Admin` and `User` roles.
    pub fn with_admin(username: &str, password: &str) -> Self {
        let directory = Self {
            users: DashMap::new(),
            user_roles: DashMap::new(),
        };

        directory
            .users
            .insert(username.to_string(), hash_password(password));
        directory.user_roles.insert(
            username.to_string(),
            Arc::new(RoleSet::from_roles([ADMIN_ROLE, DEFAULT_ROLE])),
        );

        directory
    }

    /// Whether a user with this exact (case-sensitive) name exists.
    pub fn user_exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Check a password against the stored hash.
    ///
    /// Unknown users and wrong passwords are indistinguishable: both yield
    /// `false`.
    pub fn login(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|stored| *stored.value() == hash_password(password))
            .unwrap_or(false)
    }

    /// Register a new user with the default `User` role.
    ///
    /// Idempotent: if the username is already taken the call does nothing
    /// and the existing password stays in effect. The entry API makes the
    /// check-and-create atomic, so concurrent registrations of the same
    /// username leave exactly one password stored.
    pub fn register(&self, username: &str, password: &str) {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => {
                info!(username, "registration skipped: user already exists");
            }
            Entry::Vacant(slot) => {
                // Roles go in first so the user is never visible without them.
                self.user_roles.insert(
                    username.to_string(),
                    Arc::new(RoleSet::from_roles([DEFAULT_ROLE])),
                );
                slot.insert(hash_password(password));
                info!(username, "user registered");
            }
        }
    }

    /// Grant a role. No-op if the user is missing or already has it.
    pub fn add_role(&self, username: &str, role: &str) {
        let Some(roles) = self.roles_of(username) else {
            debug!(username, role, "role not granted: user does not exist");
            return;
        };

        if roles.add(role) {
            info!(username, role, "role granted");
        }
    }

    /// Revoke a role. No-op if the user is missing or does not have it.
    pub fn remove_role(&self, username: &str, role: &str) {
        let Some(roles) = self.roles_of(username) else {
            debug!(username, role, "role not revoked: user does not exist");
            return;
        };

        if roles.remove(role) {
            info!(username, role, "role revoked");
        }
    }

    /// Whether the user currently holds the role. `false` for missing users.
    pub fn is_in_role(&self, username: &str, role: &str) -> bool {
        self.roles_of(username)
            .map(|roles| roles.contains(role))
            .unwrap_or(false)
    }

    /// Sorted snapshot of the user's roles. Empty for missing users.
    pub fn get_roles(&self, username: &str) -> Vec<String> {
        self.roles_of(username)
            .map(|roles| roles.snapshot())
            .unwrap_or_default()
    }

    /// Number of registered users (including the seeded administrator).
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // Clone the Arc out so the map shard is released before the role set's
    // own lock is taken.
    fn roles_of(&self, username: &str) -> Option<Arc<RoleSet>> {
        self.user_roles
            .get(username)
            .map(|entry| Arc::clone(entry.value()))
    }
}

impl Default for IdentityDirectory {
    fn default() -> Self {
        Self::new()
    }
}
