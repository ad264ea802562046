//! Docsage Core Library
//!
//! This crate provides core domain models, error types, configuration, and validation
//! that are shared across all Docsage components.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
