//! In-memory backend — useful for testing and local development.

use async_trait::async_trait;
use statgpt_core::error::StoreError;
use statgpt_core::store::KvStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Hashes kept in a map. Counts lookups so callers can assert on them.
#[derive(Default)]
pub struct InMemoryKvStore {
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    lookups: AtomicUsize,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.hashes
            .get_mut()
            .entry(key.into())
            .or_default()
            .insert(field.into(), value.into());
        self
    }

    pub async fn hset(&self, key: &str, field: &str, value: impl Into<String>) {
        self.hashes
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }

    /// Number of `hget` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }
}
