//! Shared errors, configuration, and authentication types for Docstore.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Layered configuration loading
//! - JWT claims and token validation

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;


pub use auth::Claims;
pub use config::{AppConfig, JwtConfig, StorageSettings};
pub use error::{AppError, AppResult};
pub use jwt::{JwtError, JwtService};
