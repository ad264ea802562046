//! API constants.

/// API path prefix for all routes.
pub const API_PREFIX: &str = "/api/v0";
