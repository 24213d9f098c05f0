//! Application-layer services

pub mod account;

pub use account::{AccountError, AccountService, AuthSession, RoleUpdate};
