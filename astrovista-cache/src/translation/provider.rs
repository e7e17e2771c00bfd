//! Translation providers

use crate::error::Result;
use async_trait::async_trait;

/// External machine-translation service
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate `text` from `source` into `target`. Language codes are
    /// already sanitised to their primary subtag.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;

    /// Name used in logs
    fn name(&self) -> &str {
        "provider"
    }
}

/// Development provider used when no real translation API is configured.
///
/// Short texts get a language marker appended; anything longer than
/// [`MockTranslationProvider::TRUNCATE_AT`] characters is truncated first.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTranslationProvider;

impl MockTranslationProvider {
    pub const TRUNCATE_AT: usize = 100;
}

#[async_trait]
impl TranslationProvider for MockTranslationProvider {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
        if text.chars().count() > Self::TRUNCATE_AT {
            let head: String = text.chars().take(Self::TRUNCATE_AT).collect();
            return Ok(format!("{}... [Translated to {}]", head, target));
        }
        Ok(format!("{} [{}]", text, target))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
