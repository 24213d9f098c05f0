//! API handlers grouped by domain

pub mod account;
pub mod files;
pub mod health;
