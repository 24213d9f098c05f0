//! # File Server API
//!
//! Authenticated file server with JWT role-based access control.
//!
//! ## Architecture
//!
//! - **identity**: In-memory user directory, role sets and password hashing
//! - **auth**: JWT issuance, verification and request middleware
//! - **application**: Account service composing identity with token issuance
//! - **files**: Flat-directory file store and streaming digests
//! - **api**: REST API with Swagger documentation
//! - **shared**: Graceful shutdown plumbing

pub mod api;
pub mod application;
pub mod auth;
pub mod config;
pub mod files;
pub mod identity;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export API router
pub use api::create_api_router;
