//! Author API endpoints
//!
//! - GET /api/authors/ - List authors with their books
//! - POST /api/authors/ - Create an author (authenticated)
//! - GET /api/authors/{id}/ - Get an author
//! - PUT|PATCH /api/authors/{id}/ - Update an author (authenticated)
//! - DELETE /api/authors/{id}/ - Delete an author and their books (authenticated)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{json_body, IdPath};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{AuthorInput, AuthorWithBooks};

/// Public author routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/authors/", get(list_authors))
        .route("/authors/{id}/", get(get_author))
}

/// Author routes that require an authenticated session
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/authors/", post(create_author))
        .route(
            "/authors/{id}/",
            put(update_author)
                .patch(partial_update_author)
                .delete(delete_author),
        )
}

/// GET /api/authors/ - List authors
async fn list_authors(State(state): State<AppState>) -> Result<Json<Vec<AuthorWithBooks>>, ApiError> {
    Ok(Json(state.catalog_service.list_authors().await?))
}

/// GET /api/authors/{id}/ - Get an author
async fn get_author(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<Json<AuthorWithBooks>, ApiError> {
    Ok(Json(state.catalog_service.get_author(id).await?))
}

/// POST /api/authors/ - Create an author
async fn create_author(
    State(state): State<AppState>,
    payload: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthorWithBooks>), ApiError> {
    let input = json_body(payload)?;
    let author = state.catalog_service.create_author(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// PUT /api/authors/{id}/ - Replace an author
async fn update_author(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    payload: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<Json<AuthorWithBooks>, ApiError> {
    let input = json_body(payload)?;
    Ok(Json(state.catalog_service.update_author(id, input, false).await?))
}

/// PATCH /api/authors/{id}/ - Update some fields of an author
async fn partial_update_author(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    payload: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<Json<AuthorWithBooks>, ApiError> {
    let input = json_body(payload)?;
    Ok(Json(state.catalog_service.update_author(id, input, true).await?))
}

/// DELETE /api/authors/{id}/ - Delete an author
async fn delete_author(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog_service.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
