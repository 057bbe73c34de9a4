// crates/core/src/llm/factory.rs
//! Translator factory: builds a `Translator` from configuration.

use std::sync::Arc;

use super::config::LlmConfig;
use super::provider::Translator;
use super::serving_endpoint::ServingEndpointTranslator;
use crate::error::TranslationError;

/// Create the translator for the given configuration.
///
/// An unconfigured endpoint still yields a translator; each call then fails
/// with `TranslationError::NotConfigured`, so jobs record per-object errors
/// instead of refusing to start.
pub fn create_translator(config: &LlmConfig) -> Result<Arc<dyn Translator>, TranslationError> {
    if !config.is_configured() {
        tracing::warn!("Serving endpoint not configured; translations will fail");
    }
    Ok(Arc::new(ServingEndpointTranslator::new(config.clone())?))
}
