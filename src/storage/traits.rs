use async_trait::async_trait;

use crate::error::Result;

/// Read access to the object store holding the concept map manifest and the
/// mapping documents it points at.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Raw contents of the object called `name`, or `None` if no such object
    /// exists.
    async fn get_object(&self, name: &str) -> Result<Option<String>>;

    /// Short label used in log output.
    fn describe(&self) -> String {
        "object store".to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub objects_count: usize,
    pub fetches: u64,
    pub misses: u64,
}
