//! Read-only lookup endpoints
//!
//! - GET /api/queries/books-by-author/?name= - Books by an author
//! - GET /api/queries/books-in-library/?name= - Books held by a library
//! - GET /api/queries/librarian/?library= - Librarian of a library
//!
//! Unknown names yield an empty list or `null`, never an error.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Book, Librarian};

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub library: String,
}

/// Build the query router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queries/books-by-author/", get(books_by_author))
        .route("/queries/books-in-library/", get(books_in_library))
        .route("/queries/librarian/", get(librarian_for_library))
}

/// GET /api/queries/books-by-author/
async fn books_by_author(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.catalog_service.books_by_author(&query.name).await?))
}

/// GET /api/queries/books-in-library/
async fn books_in_library(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.library_service.books_in_library(&query.name).await?))
}

/// GET /api/queries/librarian/
async fn librarian_for_library(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> Result<Json<Option<Librarian>>, ApiError> {
    Ok(Json(
        state
            .library_service
            .librarian_for_library(&query.library)
            .await?,
    ))
}
