//! Domain errors for the roomwarden moderation agent.

use thiserror::Error;

use crate::domain::ports::ClientError;

/// Domain-level errors that can occur while moderating rooms.
#[derive(Debug, Error)]
pub enum DomainError {
    /// `get_effective` was called before any default configuration was set.
    ///
    /// Fatal for the affected room: proceeding without a default would let
    /// every filter fail open.
    #[error("no default filter configuration has been set")]
    MissingDefaultConfiguration,

    #[error("no content filters registered")]
    NoFiltersRegistered,

    #[error("filter {filter} failed: {reason}")]
    FilterFailed { filter: String, reason: String },

    #[error("backfill for room {room_id} failed: {reason}")]
    BackfillFailed { room_id: String, reason: String },

    #[error("invalid account data blob for {kind}")]
    InvalidAccountData {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("chat backend error: {0}")]
    Client(#[from] ClientError),
}

pub type DomainResult<T> = Result<T, DomainError>;
