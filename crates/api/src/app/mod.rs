//! HTTP application wiring.
//!
//! - `services.rs`: ledger, restock service and matcher built from [`Config`]
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response bodies that are not domain types
//! - `errors.rs`: the single mapping from errors to status codes

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::config::{Config, ConfigError};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full router from configuration.
pub fn build_app(config: &Config) -> Result<Router, ConfigError> {
    let services = Arc::new(AppServices::from_config(config)?);
    Ok(router(services))
}

/// Build the router around existing services.
pub fn router(services: Arc<AppServices>) -> Router {
    routes::router().layer(ServiceBuilder::new().layer(Extension(services)))
}
