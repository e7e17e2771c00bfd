//! API routes for the AstroVista server

use axum::{
    extract::{rejection::JsonRejection, Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use astrovista_cache::{keys, CacheFacade, CacheTtls, Lookup, Translator};

use super::error::ApiError;
use super::middleware::Language;
use crate::origin::{
    Apod, ApodFilter, ApodRepository, OriginError, SearchFilter, SortOrder, DATE_FORMAT,
};

/// Header carrying the shared secret for writes
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Header reporting whether the body came from the cache
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Header carrying the number of records in a listing
pub const SIZE_HEADER: &str = "size";

/// Search page size when `perPage` is absent or out of bounds
pub const DEFAULT_PER_PAGE: usize = 20;

/// Largest accepted search page size
pub const MAX_PER_PAGE: usize = 200;

/// Languages offered by `GET /languages`: code, English name, native name
pub const SUPPORTED_LANGUAGES: &[(&str, &str, &str)] = &[
    ("en", "English", "English"),
    ("pt-BR", "Brazilian Portuguese", "Português do Brasil"),
    ("es", "Spanish", "Español"),
    ("fr", "French", "Français"),
    ("de", "German", "Deutsch"),
    ("it", "Italian", "Italiano"),
];

/// Application state
pub struct AppState {
    pub repository: Arc<dyn ApodRepository>,
    pub cache: CacheFacade,
    pub translator: Arc<Translator>,
    pub ttls: CacheTtls,
    pub internal_api_token: Option<String>,
    pub origin_timeout: Duration,
}

impl AppState {
    /// Run an origin call under the origin timeout
    async fn origin<T>(
        &self,
        call: impl Future<Output = Result<T, OriginError>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.origin_timeout, call).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => Err(ApiError::Timeout),
        }
    }

    async fn localize_all(&self, apods: Vec<Apod>, language: &Language) -> Vec<Apod> {
        futures::future::join_all(apods.into_iter().map(|apod| self.localize(apod, language)))
            .await
    }

    /// Translate the text fields of a record, keeping the original text for
    /// anything that fails
    async fn localize(&self, mut apod: Apod, language: &Language) -> Apod {
        if language.is_default() {
            return apod;
        }

        let (title, explanation) = futures::join!(
            self.translator.try_translate(&apod.title, &language.0),
            self.translator.try_translate(&apod.explanation, &language.0),
        );
        apod.title = title;
        apod.explanation = explanation;
        apod
    }

    fn token_matches(&self, headers: &HeaderMap) -> bool {
        let given = headers
            .get(API_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        matches!(
            (self.internal_api_token.as_deref(), given),
            (Some(expected), Some(given)) if expected == given
        )
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache: String,
}

/// Date range query parameters
#[derive(Deserialize)]
pub struct DateRangeQuery {
    #[serde(alias = "start")]
    pub start_date: Option<String>,
    #[serde(alias = "end")]
    pub end_date: Option<String>,
}

/// Listing of records in a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeResponse {
    pub count: usize,
    pub apods: Vec<Apod>,
}

/// `GET /apods` query; without `perPage` every record is returned
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// A page of the full listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// Records in this page
    pub count: usize,
    /// Records in the store
    pub total: usize,
    pub apods: Vec<Apod>,
}

/// `GET /apods/search` query.
///
/// Values that do not parse are ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub media_type: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort: Option<String>,
}

impl SearchQuery {
    fn filter(&self) -> SearchFilter {
        let media_type = self
            .media_type
            .as_deref()
            .filter(|m| matches!(*m, "image" | "video"))
            .map(str::to_string);
        let text = self
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let lenient_date = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
        };

        SearchFilter {
            media_type,
            text,
            start: lenient_date(&self.start_date),
            end: lenient_date(&self.end_date),
        }
    }

    fn sort(&self) -> SortOrder {
        match self.sort.as_deref().map(str::to_lowercase).as_deref() {
            Some("asc") => SortOrder::DateAscending,
            _ => SortOrder::DateDescending,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub total_results: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub results: Vec<Apod>,
}

/// Entry of `GET /languages`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    pub native_name: String,
}

fn with_cache_status(lookup: Lookup, body: impl Serialize) -> Response {
    ([(CACHE_STATUS_HEADER, lookup.as_str())], Json(body)).into_response()
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ApiError::InvalidDate(raw.to_string()))
}

/// 1-based page number; anything missing or below 1 is page 1
fn page_number(raw: Option<&str>) -> usize {
    raw.and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Page size within `1..=MAX_PER_PAGE`, `None` when absent or invalid
fn page_size(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|p| (1..=MAX_PER_PAGE).contains(p))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = if state.cache.is_enabled() {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: cache.to_string(),
    })
}

/// Most recent record
pub async fn get_latest_apod(
    State(state): State<Arc<AppState>>,
    Extension(language): Extension<Language>,
) -> Result<Response, ApiError> {
    let (apod, lookup) = state
        .cache
        .get_or_fetch(&keys::latest_record(), state.ttls.latest, || async {
            state
                .origin(state.repository.fetch_one(&ApodFilter::All))
                .await?
                .ok_or_else(|| ApiError::NotFound("Document not found".to_string(), None))
        })
        .await?;

    let apod = state.localize(apod, &language).await;
    Ok(with_cache_status(lookup, apod))
}

/// Record for a single `YYYY-MM-DD` date
pub async fn get_apod_by_date(
    State(state): State<Arc<AppState>>,
    Extension(language): Extension<Language>,
    Path(raw_date): Path<String>,
) -> Result<Response, ApiError> {
    let date = parse_date(&raw_date)?;

    let (apod, lookup) = state
        .cache
        .get_or_fetch(&keys::record_by_date(date), state.ttls.record, || async {
            state
                .origin(state.repository.fetch_one(&ApodFilter::Date(date)))
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(
                        "Document not found".to_string(),
                        Some(format!("No APOD for {}", raw_date)),
                    )
                })
        })
        .await?;

    let apod = state.localize(apod, &language).await;
    Ok(with_cache_status(lookup, apod))
}

/// Records between `start_date` and `end_date` inclusive; `end_date`
/// defaults to today
pub async fn get_apods_date_range(
    State(state): State<Arc<AppState>>,
    Extension(language): Extension<Language>,
    Query(params): Query<DateRangeQuery>,
) -> Result<Response, ApiError> {
    let start = match params.start_date.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => parse_date(raw)?,
        None => {
            return Err(ApiError::InvalidRange(
                "start_date is required (YYYY-MM-DD)".to_string(),
            ))
        }
    };
    let end = match params.end_date.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive(),
    };
    if start > end {
        return Err(ApiError::InvalidRange(format!(
            "start_date {} is after end_date {}",
            start, end
        )));
    }

    let (listing, lookup) = state
        .cache
        .get_or_fetch(&keys::date_range(start, end), state.ttls.date_range, || async {
            let apods = state
                .origin(state.repository.fetch_many(
                    &ApodFilter::DateRange { start, end },
                    SortOrder::DateAscending,
                    0,
                    None,
                ))
                .await?;

            if apods.is_empty() {
                return Err(ApiError::NotFound(
                    "No documents found for the given date range.".to_string(),
                    Some(format!("Start date: {}", start)),
                ));
            }

            Ok(DateRangeResponse {
                count: apods.len(),
                apods,
            })
        })
        .await?;

    let apods = state.localize_all(listing.apods, &language).await;

    Ok(with_cache_status(
        lookup,
        DateRangeResponse {
            count: listing.count,
            apods,
        },
    ))
}

/// Every record by ascending date, optionally paginated with `page` and
/// `perPage`. Not cached.
pub async fn get_all_apods(
    State(state): State<Arc<AppState>>,
    Extension(language): Extension<Language>,
    Query(params): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let (skip, limit) = match page_size(params.per_page.as_deref()) {
        Some(per_page) => {
            let page = page_number(params.page.as_deref());
            ((page - 1).saturating_mul(per_page), Some(per_page))
        }
        None => (0, None),
    };

    let total = state.origin(state.repository.count(&ApodFilter::All)).await?;
    if total == 0 {
        return Err(ApiError::NotFound(
            "No documents found!".to_string(),
            Some("No APODs found in the database.".to_string()),
        ));
    }

    let apods = state
        .origin(
            state
                .repository
                .fetch_many(&ApodFilter::All, SortOrder::DateAscending, skip, limit),
        )
        .await?;
    let apods = state.localize_all(apods, &language).await;

    let response = ListResponse {
        count: apods.len(),
        total,
        apods,
    };
    Ok(([(SIZE_HEADER, response.count.to_string())], Json(response)).into_response())
}

/// Filtered, paginated search. Pages are cached for the search TTL under a
/// digest of the raw query string.
pub async fn search_apods(
    State(state): State<Arc<AppState>>,
    Extension(language): Extension<Language>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let key = keys::search(raw_query.as_deref().unwrap_or_default());
    let page = page_number(params.page.as_deref());
    let per_page = page_size(params.per_page.as_deref()).unwrap_or(DEFAULT_PER_PAGE);

    let (response, lookup) = state
        .cache
        .get_or_fetch(&key, state.ttls.search, || async {
            let filter = ApodFilter::Search(params.filter());
            let total_results = state.origin(state.repository.count(&filter)).await?;
            let results = state
                .origin(state.repository.fetch_many(
                    &filter,
                    params.sort(),
                    (page - 1).saturating_mul(per_page),
                    Some(per_page),
                ))
                .await?;

            if results.is_empty() && page == 1 {
                return Err(ApiError::NotFound(
                    "No documents found matching the search criteria".to_string(),
                    None,
                ));
            }

            Ok(SearchResponse {
                total_results,
                page,
                per_page,
                total_pages: total_results.div_ceil(per_page),
                results,
            })
        })
        .await?;

    let results = state.localize_all(response.results, &language).await;
    Ok(with_cache_status(
        lookup,
        SearchResponse {
            results,
            ..response
        },
    ))
}

/// Languages responses can be translated into
pub async fn get_supported_languages() -> Json<Vec<LanguageInfo>> {
    Json(
        SUPPORTED_LANGUAGES
            .iter()
            .map(|(code, name, native_name)| LanguageInfo {
                code: code.to_string(),
                name: name.to_string(),
                native_name: native_name.to_string(),
            })
            .collect(),
    )
}

/// Store a new record. Requires the internal API token.
///
/// The origin is written first; cached copies of the latest record and of
/// the record's date are invalidated afterwards.
pub async fn post_apod(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Apod>, JsonRejection>,
) -> Result<Response, ApiError> {
    if !state.token_matches(&headers) {
        return Err(ApiError::Unauthorized);
    }

    let Json(mut apod) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let date = parse_date(&apod.date)?;
    apod.id = None;

    if state
        .origin(state.repository.fetch_one(&ApodFilter::Date(date)))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(apod.date));
    }

    let date_string = apod.date.clone();
    let id = state
        .origin(state.repository.insert(apod))
        .await
        .map_err(|e| match e {
            ApiError::Origin(OriginError::Duplicate(existing)) => ApiError::Conflict(existing),
            other => other,
        })?;

    state
        .cache
        .invalidate(&[keys::latest_record(), keys::record_by_date(date)])
        .await;
    info!("Stored APOD {} ({})", date_string, id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "APOD successfully added to database",
            "id": id,
            "date": date_string,
        })),
    )
        .into_response())
}
