//! Identity management: users, passwords and role membership.
//!
//! The directory is a purely in-memory store. All operations are synchronous
//! and thread-safe; handlers can call them directly from async context
//! without blocking concerns because every lock is held for O(1) work.

pub mod directory;
pub mod password;
pub mod role_set;

pub use directory::{IdentityDirectory, ADMIN_ROLE, DEFAULT_ROLE};
pub use password::hash_password;
pub use role_set::RoleSet;
