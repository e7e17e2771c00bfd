//! API module for the AstroVista HTTP server

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use middleware::{language_middleware, rate_limit_middleware, Language};
pub use routes::AppState;
pub use server::{router, ApiServer};
