//! JWT Token handling
//!
//! Issues and verifies HS256 bearer tokens. Every knob (signing key, issuer,
//! audience, lifetime) comes from [`JwtAuthConfig`]; an empty signing key is
//! reported as a typed configuration error rather than a panic or a silently
//! unverifiable token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT configuration (the `[jwt_auth]` section of the config file).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtAuthConfig {
    /// HMAC-SHA-256 signing key, used as raw UTF-8 bytes. Empty means token
    /// issuance is not configured.
    pub key: String,
    /// Issuer stamped into and required from every token.
    pub issuer: String,
    /// Audience stamped into and required from every token.
    pub audience: String,
    /// Token lifetime in minutes.
    pub expires_time_minutes: i64,
}

impl Default for JwtAuthConfig {
    fn default() -> Self {
        Self {
            key: std::env::var("JWT_AUTH_KEY").unwrap_or_default(),
            issuer: "fileserver-api".to_string(),
            audience: "fileserver-api-clients".to_string(),
            expires_time_minutes: 120,
        }
    }
}

/// Errors from token issuance or verification.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The signing key is empty. A deployment problem, distinct from any
    /// authentication failure.
    #[error("JWT signing key is not configured")]
    KeyNotConfigured,

    /// The token was well-formed and correctly signed, but its lifetime is
    /// over.
    #[error("token has expired")]
    Expired,

    /// Anything else: bad signature, wrong issuer or audience, garbage input.
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// Display name; mirrors the subject
    pub name: String,
    /// Granted roles, one entry per role
    pub roles: Vec<String>,
    /// Issuance time as an RFC 3339 string (locale-independent)
    pub date: String,
    /// Unique token id
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl TokenClaims {
    /// Create claims for a user. Each call draws a fresh random `jti`.
    pub fn new(
        username: &str,
        roles: &[String],
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        config: &JwtAuthConfig,
    ) -> Self {
        Self {
            sub: username.to_string(),
            name: username.to_string(),
            roles: roles.to_vec(),
            date: issued_at.to_rfc3339(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Check if the claims carry the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A signed token paired with its expiry, as handed back to clients.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Create a signed JWT for a user.
///
/// The expiry is `issued_at` plus the configured lifetime; callers pass the
/// issuance instant so the token and the reported expiry always agree.
pub fn issue_token(
    username: &str,
    roles: &[String],
    issued_at: DateTime<Utc>,
    config: &JwtAuthConfig,
) -> Result<IssuedToken, TokenError> {
    if config.key.is_empty() {
        return Err(TokenError::KeyNotConfigured);
    }

    let expires_at = issued_at + Duration::minutes(config.expires_time_minutes);
    let claims = TokenClaims::new(username, roles, issued_at, expires_at, config);

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.key.as_bytes()),
    )?;

    Ok(IssuedToken { token, expires_at })
}

/// Verify signature, expiry, issuer and audience, and decode the claims.
pub fn verify_token(token: &str, config: &JwtAuthConfig) -> Result<TokenClaims, TokenError> {
    if config.key.is_empty() {
        return Err(TokenError::KeyNotConfigured);
    }

    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);

    match decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.key.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
            _ => Err(TokenError::Invalid(e)),
        },
    }
}
