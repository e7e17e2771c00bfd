//! Behaviour when the remote tier answers with errors instead of degrading
//!
//! `FailingStore` stays enabled and fails every call, the way a Redis server
//! that rejects commands or stalls past the operation timeout would.

use astrovista_cache::{
    keys, CacheError, CacheFacade, Lookup, RemoteStore, Result, TranslationCache,
    TranslationProvider, Translator,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy)]
enum Failure {
    Remote,
    Timeout,
}

struct FailingStore {
    failure: Failure,
    calls: AtomicUsize,
}

impl FailingStore {
    fn new(failure: Failure) -> Arc<Self> {
        Arc::new(Self {
            failure,
            calls: AtomicUsize::new(0),
        })
    }

    fn fail<T>(&self, context: &str) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(match self.failure {
            Failure::Remote => CacheError::Remote(format!("{}: READONLY replica", context)),
            Failure::Timeout => CacheError::Timeout {
                timeout_ms: 2000,
                context: context.to_string(),
            },
        })
    }
}

#[async_trait]
impl RemoteStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.fail(&format!("GET {}", key))
    }

    async fn set(&self, key: &str, _value: &[u8], _ttl: Duration) -> Result<()> {
        self.fail(&format!("PSETEX {}", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.fail(&format!("DEL {}", key))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        self.fail(&format!("KEYS {}*", prefix))
    }

    async fn clear(&self) -> Result<()> {
        self.fail("FLUSHDB")
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl TranslationProvider for CountingProvider {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} ({})", text, target))
    }
}

#[tokio::test]
async fn test_get_surfaces_soft_error_not_miss() {
    for failure in [Failure::Remote, Failure::Timeout] {
        let cache = CacheFacade::new(FailingStore::new(failure));

        let result = cache.get::<String>(&keys::latest_record()).await;

        let err = result.expect_err("remote error must not look like a miss");
        assert!(err.is_soft(), "{} should be soft", err);
        assert!(cache.set("k", &"v", Duration::from_secs(60)).await.is_err());
    }
}

#[tokio::test]
async fn test_get_or_fetch_goes_to_origin_on_remote_error() {
    let store = FailingStore::new(Failure::Remote);
    let cache = CacheFacade::new(store.clone());
    let origin_calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let result: std::result::Result<(String, Lookup), String> = cache
            .get_or_fetch(&keys::latest_record(), Duration::from_secs(3600), || async {
                origin_calls.fetch_add(1, Ordering::SeqCst);
                Ok("Eagle Nebula".to_string())
            })
            .await;

        let (value, lookup) = result.unwrap();
        assert_eq!(value, "Eagle Nebula");
        assert_eq!(lookup, Lookup::Miss);
    }

    // Nothing could be written back, so every request reached the origin
    assert_eq!(origin_calls.load(Ordering::SeqCst), 2);
    // One GET and one PSETEX per request
    assert_eq!(store.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_invalidate_continues_past_errors() {
    let store = FailingStore::new(Failure::Timeout);
    let cache = CacheFacade::new(store.clone());

    cache
        .invalidate(&[keys::latest_record(), keys::search("page=1")])
        .await;

    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_translation_cache_falls_back_to_local() {
    for failure in [Failure::Remote, Failure::Timeout] {
        let cache = TranslationCache::new(
            CacheFacade::new(FailingStore::new(failure)),
            Duration::from_secs(3600),
        );

        cache.set("en:pt:hello", "olá").await;
        assert_eq!(cache.get("en:pt:hello").await, Some("olá".to_string()));
        assert_eq!(cache.get("en:pt:goodbye").await, None);

        cache.clear().await;
        assert_eq!(cache.get("en:pt:hello").await, None);
    }
}

#[tokio::test]
async fn test_translator_reuses_local_tier_when_remote_fails() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicUsize::new(0),
    });
    let cache = Arc::new(TranslationCache::new(
        CacheFacade::new(FailingStore::new(Failure::Remote)),
        Duration::from_secs(3600),
    ));
    let translator = Translator::new(provider.clone(), cache);

    for _ in 0..3 {
        assert_eq!(
            translator.translate_text("Andromeda", "fr").await.unwrap(),
            "Andromeda (fr)"
        );
    }

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
