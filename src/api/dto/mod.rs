//! Request and response DTOs

pub mod account;
pub mod common;
pub mod files;

pub use common::ApiResponse;
