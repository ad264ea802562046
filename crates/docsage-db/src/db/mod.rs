//! Database repositories for the data access layer.
//!
//! Each repository owns one domain entity: signup (tenant bootstrap), users and
//! memberships, conversations and their messages. Ownership scoping happens
//! inside the queries themselves, never in the handlers.

pub mod conversation;
pub mod signup;
pub mod user;
