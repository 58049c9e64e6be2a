//! Completion service providers for StatGPT.
//!
//! All providers implement the `statgpt_core::Provider` trait.

pub mod openai;

pub use openai::OpenAiResponsesProvider;
