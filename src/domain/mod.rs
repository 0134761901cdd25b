//! Domain layer for the roomwarden moderation agent
//!
//! Core models (events, batches, actions, configuration) and the port
//! traits infrastructure adapters implement. No I/O happens here.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
