//! roomwarden - Matrix room moderation agent
//!
//! roomwarden consumes a continuous stream of room events from a Matrix
//! homeserver, repairs truncated deliveries, fans each batch out to a set
//! of content filters, and executes the resulting corrective actions
//! (redactions, audit notices) under bounded concurrency with
//! at-most-one-in-flight semantics per event.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, port traits, and domain errors
//! - **Service Layer** (`services`): queues, reconciler, fan-out, resolver
//! - **Infrastructure Layer** (`infrastructure`): Matrix adapter, config,
//!   logging
//! - **Application Layer** (`application`): agent wiring and the sync loop
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use roomwarden::application::ModerationAgent;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load config, build a client, run the agent
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::ModerationAgent;
pub use domain::models::{
    Action, Config, ContentCategory, EffectiveConfig, FilterConfig, Notice, QueuePolicy,
    RetryPolicy, RoomEvent, SyncUpdate, TimelineBatch,
};
pub use domain::ports::{ChatClient, ClientError, ContentFilter, SyncSelector};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::{ConfigError, ConfigLoader, MatrixClient};
pub use services::{
    ActionQueue, ConfigResolver, DispatchQueue, FilterFanout, RecencyTracker, Shutdown,
    TimelineReconciler,
};
