//! Account service — application-layer orchestration
//!
//! All account business logic lives here. HTTP handlers should be thin
//! wrappers that delegate to this service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::auth::jwt::{issue_token, JwtAuthConfig, TokenError};
use crate::identity::{IdentityDirectory, DEFAULT_ROLE};

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub username: String,
    /// Primary display role: the first of the user's sorted roles, `User`
    /// when the set is empty.
    pub role: String,
}

/// Direction of a role change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleUpdate {
    Grant,
    Revoke,
}

/// Errors surfaced by the account service
#[derive(Debug, Error)]
pub enum AccountError {
    /// Unknown user or wrong password. The two cases are deliberately
    /// indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Account service — composes the identity directory with token issuance.
pub struct AccountService {
    directory: Arc<IdentityDirectory>,
    jwt_config: JwtAuthConfig,
}

impl AccountService {
    pub fn new(directory: Arc<IdentityDirectory>, jwt_config: JwtAuthConfig) -> Self {
        Self {
            directory,
            jwt_config,
        }
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate by username + password and return a signed session.
    pub fn login(&self, username: &str, password: &str) -> Result<AuthSession, AccountError> {
        if !self.directory.login(username, password) {
            return Err(AccountError::InvalidCredentials);
        }

        let roles = self.directory.get_roles(username);
        let role = roles
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let issued = issue_token(username, &roles, Utc::now(), &self.jwt_config)?;

        info!(username, role = %role, "login succeeded");
        Ok(AuthSession {
            token: issued.token,
            expires_at: issued.expires_at,
            username: username.to_string(),
            role,
        })
    }

    // ── Registration & roles ────────────────────────────────────

    /// Register a user (idempotent) and hand the username back.
    pub fn register(&self, username: &str, password: &str) -> String {
        self.directory.register(username, password);
        username.to_string()
    }

    /// Grant or revoke a role. Missing users and redundant changes are
    /// silent no-ops.
    pub fn set_role(&self, username: &str, role: &str, update: RoleUpdate) {
        match update {
            RoleUpdate::Grant => self.directory.add_role(username, role),
            RoleUpdate::Revoke => self.directory.remove_role(username, role),
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn user_exists(&self, username: &str) -> bool {
        self.directory.user_exists(username)
    }

    pub fn is_in_role(&self, username: &str, role: &str) -> bool {
        self.directory.is_in_role(username, role)
    }

    pub fn query_roles(&self, username: &str) -> Vec<String> {
        self.directory.get_roles(username)
    }

    pub fn user_count(&self) -> usize {
        self.directory.user_count()
    }
}
