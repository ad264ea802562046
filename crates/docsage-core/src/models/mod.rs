//! Domain models shared across Docsage components.

pub mod chat;
pub mod conversation;
pub mod organization;
pub mod user;

pub use chat::{
    clamp_history, ChatHistoryEntry, ChatRequest, ChatResponse, RetrievalSource, HISTORY_WINDOW,
};
pub use conversation::{
    conversation_title, Conversation, ConversationSummary, Message, MessageRole,
    SaveTurnRequest, SaveTurnResponse, TranscriptResponse, TITLE_MAX_CHARS,
};
pub use organization::Organization;
pub use user::{
    LoginRequest, LoginResponse, Membership, MembershipRole, SignupRequest, SignupResponse,
    SignupUser, User,
};
