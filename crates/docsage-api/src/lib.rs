//! Docsage API server library.
//!
//! HTTP surface for the document-question-answering assistant: signup/login,
//! conversations, chat, and document proxying to the retrieval engine.

pub mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod retrieval;
pub mod setup;
pub mod state;
