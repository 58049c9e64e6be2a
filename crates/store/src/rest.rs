//! Upstash / Vercel KV REST backend.
//!
//! Speaks the Redis-over-HTTP protocol: `GET {base}/hget/{key}/{field}` with a
//! bearer token, answered by `{"result": <string|null>}` or `{"error": "..."}`.

use async_trait::async_trait;
use serde::Deserialize;
use statgpt_core::error::StoreError;
use statgpt_core::store::KvStore;
use std::time::Duration;
use tracing::{debug, warn};

pub struct RestKvStore {
    base_url: reqwest::Url,
    token: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RestKvStore {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = reqwest::Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Request(format!("invalid REST URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Request(format!(
                "invalid REST URL: {base_url} cannot be a base"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(Self {
            base_url,
            token: token.into(),
            timeout,
            client,
        })
    }

    /// `{base}/hget/{key}/{field}` with both segments percent-encoded.
    fn hget_url(&self, key: &str, field: &str) -> Result<reqwest::Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Request("REST URL cannot be a base".into()))?
            .pop_if_empty()
            .push("hget")
            .push(key)
            .push(field);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestReply {
    fn into_value(self) -> Result<Option<String>, StoreError> {
        if let Some(error) = self.error {
            return Err(StoreError::MalformedResponse(error));
        }
        Ok(match self.result {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        })
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    fn name(&self) -> &str {
        "upstash_rest"
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let url = self.hget_url(key, field)?;
        debug!(key = %key, field = %field, "KV hget");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else {
                    StoreError::Request(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            warn!(status, key = %key, "KV service returned error");
            return Err(StoreError::Status {
                status_code: status,
                message,
            });
        }

        let reply: RestReply = response
            .json()
            .await
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
        reply.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> RestKvStore {
        RestKvStore::new(base, "token", Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn hget_url_encodes_segments() {
        let url = store("https://kv.example.com/")
            .hget_url("compiled:week 7/BUF", "blob")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://kv.example.com/hget/compiled:week%207%2FBUF/blob"
        );
    }

    #[test]
    fn hget_url_keeps_base_path() {
        let url = store("https://proxy.example.com/kv").hget_url("k", "blob").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/kv/hget/k/blob");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(RestKvStore::new("not a url", "t", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn reply_decoding() {
        let hit: RestReply = serde_json::from_str(r#"{"result":"{\"prompt\":\"x\"}"}"#).unwrap();
        assert_eq!(hit.into_value().unwrap().as_deref(), Some(r#"{"prompt":"x"}"#));

        let miss: RestReply = serde_json::from_str(r#"{"result":null}"#).unwrap();
        assert_eq!(miss.into_value().unwrap(), None);

        let err: RestReply = serde_json::from_str(r#"{"error":"WRONGTYPE"}"#).unwrap();
        assert!(matches!(err.into_value(), Err(StoreError::MalformedResponse(_))));
    }
}
