//! API layer - HTTP handlers and routing
//!
//! This module contains the JSON API served under `/api`:
//! - Book and author endpoints
//! - Library endpoints and role-gated library management
//! - Read-only query helpers
//! - Auth and user administration endpoints
//! - Health check
//!
//! `build_router` also mounts the server-rendered pages from [`crate::web`].

pub mod admin;
pub mod auth;
pub mod authors;
pub mod books;
pub mod common;
pub mod health;
pub mod libraries;
pub mod middleware;
pub mod queries;
pub mod responses;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the JSON API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .merge(admin::router())
        .merge(libraries::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Library management (librarian or admin)
    let librarian_routes = libraries::librarian_router()
        .route_layer(axum_middleware::from_fn(middleware::require_librarian))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but no particular role)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(books::protected_router())
        .merge(authors::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(books::public_router())
        .merge(authors::public_router())
        .merge(libraries::public_router())
        .merge(queries::router())
        .merge(auth::public_router())
        .merge(health::router())
        .merge(admin_routes)
        .merge(librarian_routes)
        .merge(protected_routes)
        .fallback(api_not_found)
}

/// Unknown paths under `/api` answer with the JSON envelope, not the 404 page
async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let origin = cors_origin.parse::<HeaderValue>().unwrap_or_else(|_| {
        tracing::warn!("Invalid CORS origin {:?}, falling back to localhost", cors_origin);
        HeaderValue::from_static("http://localhost:8000")
    });

    // Credentials are allowed so the session cookie works cross-origin
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .merge(crate::web::router(state.clone()))
        .fallback(crate::web::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Outermost, so error responses and redirects carry the headers too
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::security_headers,
        ))
        .with_state(state)
}
