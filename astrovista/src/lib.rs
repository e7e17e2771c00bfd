pub mod api;
pub mod config;
pub mod origin;

pub use api::{ApiError, ApiServer, AppState};
pub use config::AppConfig;
pub use origin::{
    Apod, ApodFilter, ApodRepository, InMemoryApodRepository, OriginError, SearchFilter, SortOrder,
};
