//! KvStore trait — the abstraction over the external key-value service.
//!
//! Compiled-context blobs are stored as hashes; the pipeline only ever reads
//! one field of one hash per request. Stored data is externally owned.

use crate::error::StoreError;
use async_trait::async_trait;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name (e.g. "upstash_rest", "in_memory").
    fn name(&self) -> &str;

    /// Fetch `field` of the hash stored at `key`. `Ok(None)` means absent.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
}
