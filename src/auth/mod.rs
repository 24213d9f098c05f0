//! JWT authentication: token issuance, verification and request middleware.

pub mod jwt;
pub mod middleware;

pub use jwt::{issue_token, verify_token, IssuedToken, JwtAuthConfig, TokenClaims, TokenError};
pub use middleware::{admin_middleware, auth_middleware, AuthState, AuthenticatedUser};
