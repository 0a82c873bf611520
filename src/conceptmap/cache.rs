use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use super::registry::RegistryEntry;
use crate::core::config::ConceptMapConfig;

/// Current registry snapshot plus the time each tenant last reloaded it.
///
/// The registry is replaced wholesale: readers hold on to the `Arc` they
/// cloned and never see a half-built list. Reloads are serialized through
/// [`ConceptMapCache::reload_lock`].
#[derive(Debug)]
pub struct ConceptMapCache {
    registry: RwLock<Arc<Vec<RegistryEntry>>>,
    last_reload: papaya::HashMap<String, DateTime<Utc>>,
    reload_lock: Mutex<()>,
    reload_interval: chrono::Duration,
}

impl ConceptMapCache {
    pub fn new(config: &ConceptMapConfig) -> Self {
        Self {
            registry: RwLock::new(Arc::new(Vec::new())),
            last_reload: papaya::HashMap::new(),
            reload_lock: Mutex::new(()),
            reload_interval: config.reload_interval_chrono(),
        }
    }

    pub async fn registry(&self) -> Arc<Vec<RegistryEntry>> {
        Arc::clone(&*self.registry.read().await)
    }

    /// Swap in a new registry snapshot.
    pub async fn replace_registry(&self, entries: Vec<RegistryEntry>) {
        *self.registry.write().await = Arc::new(entries);
    }

    pub fn last_reload(&self, tenant: &str) -> Option<DateTime<Utc>> {
        self.last_reload.pin().get(tenant).copied()
    }

    pub fn set_last_reload(&self, tenant: &str, at: DateTime<Utc>) {
        self.last_reload.pin().insert(tenant.to_string(), at);
    }

    /// Whether `tenant` has to reload before its next lookup: it never
    /// reloaded, its last reload is older than the reload interval, or it
    /// predates `force_after`. A `force_after` in the future therefore forces
    /// a reload on every call until the clock passes it.
    pub fn reload_needed(&self, tenant: &str, force_after: Option<DateTime<Utc>>) -> bool {
        self.reload_needed_at(tenant, force_after, Utc::now())
    }

    pub fn reload_needed_at(
        &self,
        tenant: &str,
        force_after: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(last) = self.last_reload(tenant) else {
            return true;
        };
        if now - last > self.reload_interval {
            return true;
        }
        force_after.is_some_and(|instant| last < instant)
    }

    pub async fn reload_lock(&self) -> MutexGuard<'_, ()> {
        self.reload_lock.lock().await
    }
}

impl Default for ConceptMapCache {
    fn default() -> Self {
        Self::new(&ConceptMapConfig::default())
    }
}
