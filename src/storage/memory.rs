use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::{InteropError, Result};
use crate::storage::{ObjectStore, StoreStats};

/// In-memory object store. Counts fetches per object and can be switched into
/// a failing mode, which makes it the store of choice for tests.
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, String>>>,
    fetch_counts: Arc<papaya::HashMap<String, Arc<AtomicUsize>>>,
    misses: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            fetch_counts: Arc::new(papaya::HashMap::new()),
            misses: Arc::new(AtomicU64::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn put(&self, name: impl Into<String>, contents: impl Into<String>) {
        self.objects
            .write()
            .await
            .insert(name.into(), contents.into());
    }

    /// Store `value` serialized as JSON.
    pub async fn put_json<T: serde::Serialize>(&self, name: impl Into<String>, value: &T) -> Result<()> {
        let contents = serde_json::to_string(value)?;
        self.put(name, contents).await;
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> bool {
        self.objects.write().await.remove(name).is_some()
    }

    /// While set, every fetch fails with a store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of times `name` was requested, including failed requests.
    pub fn fetch_count(&self, name: &str) -> usize {
        self.fetch_counts
            .pin()
            .get(name)
            .map_or(0, |count| count.load(Ordering::SeqCst))
    }

    pub async fn stats(&self) -> StoreStats {
        let fetches = self
            .fetch_counts
            .pin()
            .values()
            .map(|count| count.load(Ordering::SeqCst) as u64)
            .sum();
        StoreStats {
            objects_count: self.objects.read().await.len(),
            fetches,
            misses: self.misses.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, name: &str) -> Result<Option<String>> {
        self.fetch_counts
            .pin()
            .get_or_insert_with(name.to_string(), || Arc::new(AtomicUsize::new(0)))
            .fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(InteropError::store(format!(
                "object store unavailable while fetching '{name}'"
            )));
        }

        let contents = self.objects.read().await.get(name).cloned();
        if contents.is_none() {
            self.misses.fetch_add(1, Ordering::SeqCst);
        }
        Ok(contents)
    }

    fn describe(&self) -> String {
        "memory object store".to_string()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryObjectStore {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
            fetch_counts: Arc::clone(&self.fetch_counts),
            misses: Arc::clone(&self.misses),
            failing: Arc::clone(&self.failing),
        }
    }
}
