//! Configuration overlay resolution.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{EffectiveConfig, EnvironmentConfig, FilterConfig};

/// Resolves the effective filter configuration for a room from the global
/// default plus that room's sparse override, caching the merged result.
///
/// Cache entries are invalidated when either contributing configuration
/// changes, never on a timer. All state is internally synchronized; callers
/// share the resolver via `Arc` without external locking.
///
/// The resolver also owns the environment pointers (log/control room ids)
/// pushed over the same account-data channel, so every component asking
/// "is this one of our own rooms?" asks here.
#[derive(Default)]
pub struct ConfigResolver {
    default: RwLock<Option<FilterConfig>>,
    overrides: RwLock<HashMap<String, FilterConfig>>,
    cache: RwLock<HashMap<String, Arc<EffectiveConfig>>>,
    environment: RwLock<EnvironmentConfig>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global default; every cached effective config becomes
    /// stale and is dropped.
    pub fn set_default(&self, config: FilterConfig) {
        *self.default.write().expect("resolver poisoned") = Some(config);
        self.cache.write().expect("resolver poisoned").clear();
        debug!("default filter configuration replaced, cache cleared");
    }

    /// Replace one room's override; only that room's cache entry is dropped.
    pub fn set_override(&self, room_id: &str, config: FilterConfig) {
        self.overrides
            .write()
            .expect("resolver poisoned")
            .insert(room_id.to_owned(), config);
        self.cache.write().expect("resolver poisoned").remove(room_id);
        debug!(room_id, "room filter configuration override replaced");
    }

    pub fn has_default(&self) -> bool {
        self.default.read().expect("resolver poisoned").is_some()
    }

    /// The merged, fully populated configuration for one room.
    ///
    /// Fails with [`DomainError::MissingDefaultConfiguration`] when no
    /// default has ever been set: silently returning an empty configuration
    /// would let every filter fail open.
    pub fn get_effective(&self, room_id: &str) -> DomainResult<Arc<EffectiveConfig>> {
        if let Some(cached) = self.cache.read().expect("resolver poisoned").get(room_id) {
            return Ok(Arc::clone(cached));
        }

        let default = self
            .default
            .read()
            .expect("resolver poisoned")
            .clone()
            .ok_or(DomainError::MissingDefaultConfiguration)?;

        let merged = {
            let overrides = self.overrides.read().expect("resolver poisoned");
            Arc::new(EffectiveConfig::merge(&default, overrides.get(room_id)))
        };

        self.cache
            .write()
            .expect("resolver poisoned")
            .insert(room_id.to_owned(), Arc::clone(&merged));
        Ok(merged)
    }

    pub fn set_environment(&self, environment: EnvironmentConfig) {
        *self.environment.write().expect("resolver poisoned") = environment;
    }

    pub fn environment(&self) -> EnvironmentConfig {
        self.environment.read().expect("resolver poisoned").clone()
    }

    pub fn log_room_id(&self) -> Option<String> {
        self.environment
            .read()
            .expect("resolver poisoned")
            .log_room_id
            .clone()
    }

    /// Rooms the agent uses for its own logging/control; filters must never
    /// see events from these.
    pub fn is_reserved_room(&self, room_id: &str) -> bool {
        let env = self.environment.read().expect("resolver poisoned");
        env.log_room_id.as_deref() == Some(room_id)
            || env.control_room_id.as_deref() == Some(room_id)
    }

    pub fn reserved_rooms(&self) -> Vec<String> {
        let env = self.environment.read().expect("resolver poisoned");
        env.log_room_id
            .iter()
            .chain(env.control_room_id.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ContentCategory, FilterSection};

    fn allow(category_allowed: bool) -> FilterSection {
        FilterSection {
            allowed: Some(category_allowed),
            ignored_users: None,
        }
    }

    #[test]
    fn missing_default_fails_loudly() {
        let resolver = ConfigResolver::new();
        let err = resolver.get_effective("!r:example.org").unwrap_err();
        assert!(matches!(err, DomainError::MissingDefaultConfiguration));
    }

    #[test]
    fn override_fields_replace_unset_inherit() {
        let resolver = ConfigResolver::new();
        resolver.set_default(FilterConfig {
            image_filter: Some(allow(false)),
            video_filter: Some(allow(true)),
            ..Default::default()
        });
        resolver.set_override(
            "!r:example.org",
            FilterConfig {
                image_filter: Some(allow(true)),
                ..Default::default()
            },
        );

        let effective = resolver.get_effective("!r:example.org").unwrap();
        assert!(effective.section(ContentCategory::Image).allowed);
        assert!(effective.section(ContentCategory::Video).allowed);

        // a room without an override sees the default
        let other = resolver.get_effective("!other:example.org").unwrap();
        assert!(!other.section(ContentCategory::Image).allowed);
    }

    #[test]
    fn cache_returns_same_instance_until_invalidated() {
        let resolver = ConfigResolver::new();
        resolver.set_default(FilterConfig::default());

        let first = resolver.get_effective("!r:example.org").unwrap();
        let second = resolver.get_effective("!r:example.org").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        resolver.set_override("!r:example.org", FilterConfig::default());
        let third = resolver.get_effective("!r:example.org").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn set_default_invalidates_every_room() {
        let resolver = ConfigResolver::new();
        resolver.set_default(FilterConfig {
            image_filter: Some(allow(false)),
            ..Default::default()
        });

        let before = resolver.get_effective("!a:example.org").unwrap();
        assert!(!before.section(ContentCategory::Image).allowed);

        resolver.set_default(FilterConfig {
            image_filter: Some(allow(true)),
            ..Default::default()
        });
        let after = resolver.get_effective("!a:example.org").unwrap();
        assert!(after.section(ContentCategory::Image).allowed);
    }

    #[test]
    fn set_override_invalidates_only_that_room() {
        let resolver = ConfigResolver::new();
        resolver.set_default(FilterConfig::default());

        let a = resolver.get_effective("!a:example.org").unwrap();
        let b = resolver.get_effective("!b:example.org").unwrap();

        resolver.set_override("!a:example.org", FilterConfig::default());

        let a2 = resolver.get_effective("!a:example.org").unwrap();
        let b2 = resolver.get_effective("!b:example.org").unwrap();
        assert!(!Arc::ptr_eq(&a, &a2));
        assert!(Arc::ptr_eq(&b, &b2));
    }

    #[test]
    fn reserved_rooms_follow_environment() {
        let resolver = ConfigResolver::new();
        assert!(!resolver.is_reserved_room("!log:example.org"));

        resolver.set_environment(EnvironmentConfig {
            log_room_id: Some("!log:example.org".into()),
            control_room_id: Some("!control:example.org".into()),
        });

        assert!(resolver.is_reserved_room("!log:example.org"));
        assert!(resolver.is_reserved_room("!control:example.org"));
        assert!(!resolver.is_reserved_room("!general:example.org"));
        assert_eq!(resolver.reserved_rooms().len(), 2);
    }
}
