pub mod action;
pub mod batch;
pub mod config;
pub mod event;
pub mod filter_config;
pub mod notice;

pub use action::{Action, ActionFuture, RetryPolicy};
pub use batch::{AccountDataEvent, EventPage, SyncUpdate, TimelineBatch};
pub use config::{
    Config, HomeserverConfig, LoggingConfig, QueueConfig, QueuePolicy, ReconcilerConfig,
    RetryConfig, SyncConfig,
};
pub use event::{RoomEvent, MESSAGE_EVENT_TYPE, REDACTION_EVENT_TYPE};
pub use filter_config::{
    ContentCategory, EffectiveConfig, EffectiveSection, EnvironmentConfig, FilterConfig,
    FilterSection, ENVIRONMENT_EVENT_TYPE, FILTER_CONFIG_EVENT_TYPE,
};
pub use notice::{DispatchMessage, Notice};
