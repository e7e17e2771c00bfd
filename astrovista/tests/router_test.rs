//! Router tests driven in-process, without a listener

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use astrovista::api::router;
use astrovista::{Apod, AppState, InMemoryApodRepository};
use astrovista_cache::{
    CacheFacade, CacheTtls, MemoryStore, MockTranslationProvider, RateLimitConfig, RateLimiter,
    TranslationCache, Translator,
};

fn state(token: Option<&str>) -> Arc<AppState> {
    let cache = CacheFacade::new(Arc::new(MemoryStore::new()));
    let translations = Arc::new(TranslationCache::new(cache.clone(), Duration::from_secs(3600)));

    Arc::new(AppState {
        repository: Arc::new(InMemoryApodRepository::with_records(vec![Apod {
            id: None,
            date: "2024-04-08".to_string(),
            explanation: "Totality over North America.".to_string(),
            hdurl: String::new(),
            media_type: "image".to_string(),
            service_version: "v1".to_string(),
            title: "Eclipse".to_string(),
            url: String::new(),
        }])),
        cache,
        translator: Arc::new(Translator::new(Arc::new(MockTranslationProvider), translations)),
        ttls: CacheTtls::default(),
        internal_api_token: token.map(str::to_string),
        origin_timeout: Duration::from_secs(10),
    })
}

fn limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(RateLimitConfig::default()))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/apod")
        .header("content-type", "application/json")
        .header("x-api-token", "secret")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_requests_without_peer_address_share_one_window() {
    let app = router(state(Some("secret")), limiter());
    let body = r#"{"date":"2024-04-09","title":"Aftermath"}"#;

    let first = app.clone().oneshot(post(body)).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.oneshot(post(body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers()["retry-after"], "60");
}

#[tokio::test]
async fn test_get_routes_bypass_limiter() {
    let app = router(state(None), limiter());

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/apod").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_lang_query_translates_fields() {
    let app = router(state(None), limiter());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/apod?lang=fr")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["title"], "Eclipse [fr]");
    assert_eq!(body["explanation"], "Totality over North America. [fr]");
}

#[tokio::test]
async fn test_percent_encoded_lang_is_decoded() {
    let app = router(state(None), limiter());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/apod?lang=pt%2DBR")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["title"], "Eclipse [pt]");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = router(state(None), limiter());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
