//! # Translation pipeline
//!
//! [`Translator`] looks a text up in the [`TranslationCache`], calls the
//! configured [`TranslationProvider`] on a miss and writes the result back.
//! Source text is always English.

pub mod cache;
pub mod provider;

pub use cache::TranslationCache;
pub use provider::{MockTranslationProvider, TranslationProvider};

use crate::error::{CacheError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Language every stored text is written in
pub const SOURCE_LANGUAGE: &str = "en";

/// Texts up to this many characters are used verbatim in cache keys
const VERBATIM_KEY_CHARS: usize = 32;

/// Edge length kept from longer texts
const KEY_EDGE_CHARS: usize = 16;

/// Cache key for a translation: `{source}:{target}:{text_key(text)}`
pub fn translation_key(text: &str, source: &str, target: &str) -> String {
    format!("{}:{}:{}", source, target, text_key(text))
}

/// Compact, stable stand-in for `text` inside a cache key.
///
/// Short texts are returned unchanged. Longer ones keep their first and last
/// 16 characters plus the character count.
pub fn text_key(text: &str) -> String {
    let count = text.chars().count();
    if count <= VERBATIM_KEY_CHARS {
        return text.to_string();
    }

    let head: String = text.chars().take(KEY_EDGE_CHARS).collect();
    let tail: String = text.chars().skip(count - KEY_EDGE_CHARS).collect();
    format!("{}...{}:{}", head, tail, count)
}

/// Lowercased primary subtag: `pt-BR` becomes `pt`
pub fn sanitize_language_code(lang: &str) -> String {
    lang.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Cached translation of English text through a provider
pub struct Translator {
    provider: Arc<dyn TranslationProvider>,
    cache: Arc<TranslationCache>,
    timeout: Duration,
}

impl Translator {
    pub fn new(provider: Arc<dyn TranslationProvider>, cache: Arc<TranslationCache>) -> Self {
        Self {
            provider,
            cache,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the provider call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Translate `text` into `target`.
    ///
    /// An empty or English target returns the text unchanged. Provider errors
    /// and timeouts are returned as [`CacheError::Provider`].
    pub async fn translate_text(&self, text: &str, target: &str) -> Result<String> {
        let target = sanitize_language_code(target);
        if target.is_empty() || target == SOURCE_LANGUAGE {
            return Ok(text.to_string());
        }

        let key = translation_key(text, SOURCE_LANGUAGE, &target);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Translation cache hit: {}", key);
            return Ok(cached);
        }

        debug!(
            "Translating '{}' to '{}' with {}",
            truncate_for_log(text),
            target,
            self.provider.name()
        );

        let translated = tokio::time::timeout(
            self.timeout,
            self.provider.translate(text, SOURCE_LANGUAGE, &target),
        )
        .await
        .map_err(|_| {
            CacheError::Provider(format!(
                "{} timed out after {}ms",
                self.provider.name(),
                self.timeout.as_millis()
            ))
        })??;

        self.cache.set(&key, &translated).await;
        Ok(translated)
    }

    /// Like [`translate_text`](Self::translate_text) but falls back to the
    /// original text on any error
    pub async fn try_translate(&self, text: &str, target: &str) -> String {
        if target == SOURCE_LANGUAGE || text.trim().is_empty() {
            return text.to_string();
        }

        match self.translate_text(text, target).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation to '{}' failed, serving original text: {}", target, e);
                text.to_string()
            }
        }
    }
}

fn truncate_for_log(text: &str) -> String {
    if text.chars().count() > 50 {
        let head: String = text.chars().take(50).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
