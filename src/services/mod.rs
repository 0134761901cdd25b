pub mod action_queue;
pub mod config_resolver;
pub mod dispatch_queue;
pub mod fanout;
pub mod filters;
pub mod info_cache;
pub mod reconciler;
pub mod recency;
pub mod worker;

pub use action_queue::{build_action_queue, ActionQueue, FifoActionQueue, LifoActionQueue};
pub use config_resolver::ConfigResolver;
pub use dispatch_queue::DispatchQueue;
pub use fanout::FilterFanout;
pub use info_cache::InfoCache;
pub use reconciler::TimelineReconciler;
pub use recency::RecencyTracker;
pub use worker::{Shutdown, WakeTimer};
