//! Key-value store backends for StatGPT.
//!
//! Compiled-context blobs are written by the authoring system and looked up
//! here by pointer key. All backends implement `statgpt_core::KvStore`.

pub mod in_memory;
pub mod rest;

pub use in_memory::InMemoryKvStore;
pub use rest::RestKvStore;

use statgpt_config::KvConfig;
use statgpt_core::error::StoreError;
use std::sync::Arc;

/// Build the REST store when credentials are configured.
///
/// `Ok(None)` means no credentials. Credentials that are present but unusable
/// (a malformed REST URL) are an error, not a silently disabled store.
pub fn from_config(
    config: &KvConfig,
) -> Result<Option<Arc<dyn statgpt_core::KvStore>>, StoreError> {
    let Some((url, token)) = config.credentials() else {
        return Ok(None);
    };
    let store = RestKvStore::new(url, token, std::time::Duration::from_secs(config.timeout_secs))?;
    Ok(Some(Arc::new(store)))
}
