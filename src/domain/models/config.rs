use serde::{Deserialize, Serialize};

/// Main configuration structure for roomwarden
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Homeserver connection settings
    pub homeserver: HomeserverConfig,

    /// Fully qualified user ids allowed to administer the agent; they are
    /// invited to the log and control rooms and exempted from filters.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Queue behaviour (policy, concurrency permits, retention)
    #[serde(default)]
    pub queue: QueueConfig,

    /// Timeline reconciliation settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Retry policy for corrective actions
    #[serde(default)]
    pub retry: RetryConfig,

    /// Sync loop settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Seconds granted to the background loops to flush their backlogs on
    /// shutdown before the process exits anyway.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

const fn default_shutdown_timeout_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            homeserver: HomeserverConfig::default(),
            admins: vec![],
            queue: QueueConfig::default(),
            reconciler: ReconcilerConfig::default(),
            retry: RetryConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Homeserver connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HomeserverConfig {
    /// Base URL of the homeserver, e.g. `https://matrix.example.org`
    #[serde(default)]
    pub base_url: String,

    /// Access token for the agent's account. Usually supplied via the
    /// `ROOMWARDEN_HOMESERVER__ACCESS_TOKEN` environment variable.
    #[serde(default)]
    pub access_token: String,
}

/// Ordering policy for the corrective action queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePolicy {
    /// Strict submission order; completed ids are never re-admitted.
    Fifo,
    /// Freshest-first; an id is re-admitted once its work completes.
    #[default]
    Lifo,
}

/// Queue behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Ordering policy for corrective actions
    #[serde(default)]
    pub policy: QueuePolicy,

    /// Concurrent redactions allowed
    #[serde(default = "default_redactions")]
    pub redactions: usize,

    /// Concurrent log-room messages allowed
    #[serde(default = "default_log_messages")]
    pub log_messages: usize,

    /// Bound on the recent-id tracker; unset keeps ids forever (the FIFO
    /// policy then never re-admits an id for the process lifetime).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recency_retention: Option<usize>,

    /// Safety-net wake interval for the action drain loop, in seconds
    #[serde(default = "default_wake_interval_secs")]
    pub wake_interval_secs: u64,

    /// Dispatch queue tick interval, in milliseconds
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,

    /// Queue depth beyond which a warning is logged
    #[serde(default = "default_warn_depth")]
    pub warn_depth: usize,
}

const fn default_redactions() -> usize {
    1
}

const fn default_log_messages() -> usize {
    1
}

const fn default_wake_interval_secs() -> u64 {
    10
}

const fn default_dispatch_interval_ms() -> u64 {
    1_000
}

const fn default_warn_depth() -> usize {
    100
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            policy: QueuePolicy::default(),
            redactions: default_redactions(),
            log_messages: default_log_messages(),
            recency_retention: None,
            wake_interval_secs: default_wake_interval_secs(),
            dispatch_interval_ms: default_dispatch_interval_ms(),
            warn_depth: default_warn_depth(),
        }
    }
}

/// Timeline reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReconcilerConfig {
    /// Maximum events fetched to complete a truncated batch
    #[serde(default = "default_backfill_limit")]
    pub backfill_limit: u32,

    /// Timeline limit requested in the sync filter
    #[serde(default = "default_timeline_limit")]
    pub timeline_limit: u32,
}

const fn default_backfill_limit() -> u32 {
    500
}

const fn default_timeline_limit() -> u32 {
    5_000
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            backfill_limit: default_backfill_limit(),
            timeline_limit: default_timeline_limit(),
        }
    }
}

/// Retry policy configuration for corrective actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Sync loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncConfig {
    /// Long-poll timeout passed to the backend, in milliseconds
    #[serde(default = "default_sync_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause before retrying after a failed sync, in seconds
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

const fn default_sync_timeout_ms() -> u64 {
    30_000
}

const fn default_error_backoff_secs() -> u64 {
    5
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_sync_timeout_ms(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for daily-rotated log files; unset logs to stderr only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}
