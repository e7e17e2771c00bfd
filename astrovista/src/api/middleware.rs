//! Request middleware for Axum

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use astrovista_cache::{sanitize_language_code, RateLimiter};

/// Key used when the peer address is not available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Preferred response language, set by [`language_middleware`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language(pub String);

impl Language {
    pub fn is_default(&self) -> bool {
        self.0 == "en"
    }
}

impl Default for Language {
    fn default() -> Self {
        Language("en".to_string())
    }
}

/// Admits requests through the sliding-window limiter, keyed by peer IP
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);

    if !limiter.allow(&client).await {
        info!("Rate limit exceeded for {} on {}", client, request.uri().path());
        return too_many_requests(limiter.retry_after().as_secs());
    }

    next.run(request).await
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn too_many_requests(retry_after_secs: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": "Rate limit exceeded. Please try again later." })),
    )
        .into_response();

    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

/// Detects the response language from `?lang=` or `Accept-Language`.
///
/// The query parameter wins over the header. Only the primary subtag of the
/// first preference is kept, so `pt-BR,pt;q=0.9` becomes `pt`.
pub async fn language_middleware(mut request: Request, next: Next) -> Response {
    let language = detect_language(&request);
    request.extensions_mut().insert(language);
    next.run(request).await
}

#[derive(Debug, Default, Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

fn detect_language(request: &Request) -> Language {
    // A malformed query string is treated as if `lang` were absent
    let from_query = Query::<LangQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.lang);

    let raw = from_query.filter(|v| !v.is_empty()).or_else(|| {
        request
            .headers()
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    });

    raw.and_then(|raw| {
        let first = raw.split(',').next()?.split(';').next()?;
        let code = sanitize_language_code(first);
        (!code.is_empty() && code != "*").then_some(Language(code))
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, accept_language: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = accept_language {
            builder = builder.header(header::ACCEPT_LANGUAGE, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_language_from_query() {
        assert_eq!(
            detect_language(&request("/apod?lang=pt-BR", Some("es"))),
            Language("pt".to_string())
        );
    }

    #[test]
    fn test_language_from_header() {
        assert_eq!(
            detect_language(&request("/apod", Some("fr-CA,fr;q=0.9,en;q=0.8"))),
            Language("fr".to_string())
        );
    }

    #[test]
    fn test_language_from_encoded_query() {
        assert_eq!(
            detect_language(&request("/apod?lang=pt%2DBR", None)),
            Language("pt".to_string())
        );
        assert_eq!(
            detect_language(&request("/apods?page=2&lang=de%2CDE&perPage=5", None)),
            Language("de".to_string())
        );
    }

    #[test]
    fn test_language_default() {
        assert!(detect_language(&request("/apod", None)).is_default());
        assert!(detect_language(&request("/apod?lang=", Some("*"))).is_default());
    }

    #[test]
    fn test_client_key_without_connect_info() {
        assert_eq!(client_key(&request("/apod", None)), UNKNOWN_CLIENT);
    }
}
