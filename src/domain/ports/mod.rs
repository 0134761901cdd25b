//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the rest of the system is written against:
//! - `ChatClient`: the homeserver (sync, history, redact, send, account data)
//! - `ContentFilter`: a moderation filter participating in the fan-out
//!
//! Infrastructure adapters implement these; services and the application
//! layer depend only on the traits.

pub mod chat_client;
pub mod content_filter;

pub use chat_client::{ChatClient, ClientError, ClientResult, SyncSelector};
pub use content_filter::ContentFilter;
