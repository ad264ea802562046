//! HTTP request handlers.

pub mod auth;
pub mod chat;
pub mod conversations;
pub mod documents;
pub mod health;
