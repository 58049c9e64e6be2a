//! # StatGPT Core
//!
//! Domain types, traits, and error definitions for the StatGPT chat gateway.
//! This crate has **zero framework dependencies**: it defines the request-scoped
//! domain model that the pipeline, providers, stores and gateway build on.
//!
//! ## Design Philosophy
//!
//! The two external collaborators (the completion service and the key-value
//! service) are traits here. Implementations live in their own crates, so the
//! normalization pipeline can be exercised against in-memory stand-ins.

pub mod compiled;
pub mod error;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use compiled::CompiledContext;
pub use error::{ContextError, Error, ProviderError, Result, StoreError};
pub use message::{ContentPart, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use store::KvStore;
