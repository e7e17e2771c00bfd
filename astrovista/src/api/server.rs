//! API server for AstroVista

use anyhow::Result;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use astrovista_cache::{
    start_idle_sweeper, CacheFacade, MockTranslationProvider, RateLimiter, RedisStore,
    RemoteStore, TranslationCache, TranslationProvider, Translator,
};

use super::middleware::{language_middleware, rate_limit_middleware};
use super::routes::{
    get_all_apods, get_apod_by_date, get_apods_date_range, get_latest_apod,
    get_supported_languages, health_check, post_apod, search_apods, AppState,
};
use crate::config::AppConfig;
use crate::origin::{ApodRepository, InMemoryApodRepository};

/// Build the application router.
///
/// Only `POST /apod` goes through the rate limiter.
pub fn router(state: Arc<AppState>, limiter: Arc<RateLimiter>) -> Router {
    let apod = get(get_latest_apod).merge(
        post(post_apod).route_layer(from_fn_with_state(limiter, rate_limit_middleware)),
    );

    Router::new()
        .route("/health", get(health_check))
        .route("/apod", apod)
        .route("/apod/:date", get(get_apod_by_date))
        .route("/apods", get(get_all_apods))
        .route("/apods/search", get(search_apods))
        .route("/apods/date-range", get(get_apods_date_range))
        .route("/languages", get(get_supported_languages))
        .with_state(state)
        .layer(from_fn(language_middleware))
        .layer(CorsLayer::permissive())
}

/// API server
pub struct ApiServer {
    config: AppConfig,
    repository: Arc<dyn ApodRepository>,
    store: Option<Arc<dyn RemoteStore>>,
    provider: Arc<dyn TranslationProvider>,
}

impl ApiServer {
    /// Create a new API server with configuration and an empty in-memory
    /// origin store
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            repository: Arc::new(InMemoryApodRepository::new()),
            store: None,
            provider: Arc::new(MockTranslationProvider),
        }
    }

    /// Use `repository` as the origin store
    pub fn with_repository(mut self, repository: Arc<dyn ApodRepository>) -> Self {
        self.repository = repository;
        self
    }

    /// Use `store` as the remote cache tier instead of connecting to Redis
    pub fn with_store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_translation_provider(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Start the API server on the configured address
    pub async fn start(self) -> Result<()> {
        let addr = self.config.addr();
        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.config.rate_limit.validate()?;

        let store: Arc<dyn RemoteStore> = match self.store {
            Some(store) => store,
            None => Arc::new(RedisStore::connect(self.config.remote.clone()).await),
        };
        let cache = CacheFacade::new(store);

        let translations = Arc::new(TranslationCache::new(
            cache.clone(),
            self.config.ttls.translation,
        ));
        let translator = Arc::new(
            Translator::new(self.provider, translations)
                .with_timeout(self.config.translation_timeout),
        );

        let limiter = Arc::new(RateLimiter::new(self.config.rate_limit.clone()));
        tokio::spawn(start_idle_sweeper(
            limiter.clone(),
            self.config.rate_limit.window,
        ));

        if self.config.internal_api_token.is_none() {
            info!("INTERNAL_API_TOKEN is not set, POST /apod will reject every request");
        }

        let state = Arc::new(AppState {
            repository: self.repository,
            cache,
            translator,
            ttls: self.config.ttls.clone(),
            internal_api_token: self.config.internal_api_token.clone(),
            origin_timeout: self.config.origin_timeout,
        });

        let app = router(state, limiter);

        info!("Listening on {}", listener.local_addr()?);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
