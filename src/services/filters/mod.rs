//! Content filter implementations.
//!
//! Each media category gets its own [`AttachmentFilter`] instance in the
//! fan-out. The `url` category is configuration-only for now: body matching
//! belongs to the surrounding application, not to this core.

mod attachment;

pub use attachment::AttachmentFilter;

use std::sync::Arc;

use crate::domain::models::{ContentCategory, RetryPolicy};
use crate::domain::ports::{ChatClient, ContentFilter};
use crate::services::action_queue::ActionQueue;
use crate::services::config_resolver::ConfigResolver;
use crate::services::dispatch_queue::DispatchQueue;
use crate::services::info_cache::InfoCache;

/// Build the standard filter set: one attachment filter per media category.
pub fn standard_filters(
    client: &Arc<dyn ChatClient>,
    resolver: &Arc<ConfigResolver>,
    actions: &Arc<dyn ActionQueue>,
    dispatch: &Arc<DispatchQueue>,
    info: &Arc<InfoCache>,
    retry: &RetryPolicy,
) -> Vec<Arc<dyn ContentFilter>> {
    [
        ContentCategory::Image,
        ContentCategory::Video,
        ContentCategory::Audio,
        ContentCategory::File,
    ]
    .into_iter()
    .map(|category| {
        Arc::new(AttachmentFilter::new(
            category,
            Arc::clone(client),
            Arc::clone(resolver),
            Arc::clone(actions),
            Arc::clone(dispatch),
            Arc::clone(info),
            retry.clone(),
        )) as Arc<dyn ContentFilter>
    })
    .collect()
}
