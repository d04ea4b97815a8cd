//! Lookup into the live object configuration.

use crate::event::EntityKey;
use dashmap::DashMap;
use std::sync::Arc;

/// Configuration of a host or service as far as history reporting cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityConfig {
    pub alias: String,
    /// Empty means no period configured, i.e. always active
    pub notification_period: String,
    /// Empty means no period configured, i.e. always active
    pub service_period: String,
}

impl EntityConfig {
    pub fn with_periods(notification_period: &str, service_period: &str) -> Self {
        Self {
            alias: String::new(),
            notification_period: notification_period.to_string(),
            service_period: service_period.to_string(),
        }
    }
}

/// Read-only view of the currently configured entities. Shared by all
/// reconstruction workers.
pub trait LiveConfig: Send + Sync {
    fn resolve(&self, key: &EntityKey) -> Option<Arc<EntityConfig>>;

    fn exists(&self, key: &EntityKey) -> bool {
        self.resolve(key).is_some()
    }
}

#[derive(Debug, Default)]
pub struct StaticLiveConfig {
    entities: DashMap<EntityKey, Arc<EntityConfig>>,
}

impl StaticLiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: EntityKey, config: EntityConfig) -> Arc<EntityConfig> {
        let config = Arc::new(config);
        self.entities.insert(key, Arc::clone(&config));
        config
    }

    pub fn remove(&self, key: &EntityKey) -> Option<Arc<EntityConfig>> {
        self.entities.remove(key).map(|(_, config)| config)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl LiveConfig for StaticLiveConfig {
    fn resolve(&self, key: &EntityKey) -> Option<Arc<EntityConfig>> {
        self.entities.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn exists(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }
}
