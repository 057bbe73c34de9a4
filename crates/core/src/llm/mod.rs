// crates/core/src/llm/mod.rs
//! SQL dialect translation through a model-serving endpoint.
//!
//! Provides the `Translator` trait, the serving-endpoint implementation and
//! the prompt/answer helpers it uses.

pub mod config;
pub mod factory;
pub mod prompt;
pub mod provider;
pub mod serving_endpoint;
pub mod types;

pub use config::LlmConfig;
pub use factory::create_translator;
pub use provider::Translator;
pub use serving_endpoint::ServingEndpointTranslator;
pub use types::{Translation, TranslationMetrics, TranslationRequest};
