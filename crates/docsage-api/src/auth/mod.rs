//! Authentication: password hashing, session tokens, and the bearer middleware.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use jwt::JwtService;
pub use models::{SessionClaims, SessionContext};
