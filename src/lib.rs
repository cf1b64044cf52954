//! Beverage CMS
//!
//! Back-office API for a beverage distributor: customers, the product
//! catalog, order requests from the website, PDF/Excel exports and an
//! activity log, behind session-cookie authentication.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod reports;
pub mod services;
pub mod tracing;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// CMS routes; every handler in here requires a session.
pub fn cms_routes() -> Router<AppState> {
    Router::new()
        .nest("/customers", handlers::customers::customer_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/orders", handlers::orders::order_routes())
        .nest("/logs", handlers::activity_logs::activity_log_routes())
        .nest("/users", handlers::users::user_routes())
        .nest("/export", handlers::exports::export_routes())
}

/// Full application router with the shared middleware stack. CORS is added
/// by the caller since it depends on deployment configuration.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "beverage-cms up" }))
        .route("/health", get(handlers::health::health))
        .nest("/api/auth", handlers::auth::auth_routes())
        .nest("/api/cms", cms_routes())
        .nest("/api/public", handlers::public::public_routes())
        .merge(openapi::openapi_routes())
        .layer(tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

/// CORS policy from configuration: explicit origins (with credentials, so
/// the session cookie travels), permissive in development or when opted in,
/// otherwise an error.
pub fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, errors::ServiceError> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers([header::CONTENT_DISPOSITION])
            .allow_credentials(true))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        Err(errors::ServiceError::InternalError(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".to_string(),
        ))
    }
}
