// crates/core/src/llm/provider.rs
//! Translator trait defining the interface for SQL dialect translation.

use async_trait::async_trait;

use super::types::{Translation, TranslationRequest};
use crate::error::TranslationError;

/// Translates one object's SQL from a source dialect to lakehouse SQL.
///
/// Implementations may be slow (a network round trip to a model) and may
/// fail; callers decide whether to retry. Timeouts are the implementation's
/// concern.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: TranslationRequest) -> Result<Translation, TranslationError>;

    /// Provider name for logging/display (e.g. "serving-endpoint").
    fn name(&self) -> &str;
}
