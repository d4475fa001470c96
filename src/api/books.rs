//! Book API endpoints
//!
//! - GET /api/books/ - List books (filter, search, ordering)
//! - POST /api/books/ - Create a book (authenticated)
//! - GET /api/books/{id}/ - Get a book
//! - POST /api/books/create/ - Create a book (authenticated)
//! - PUT|PATCH /api/books/{id}/update/ - Update a book (authenticated)
//! - DELETE /api/books/{id}/delete/ - Delete a book (authenticated)

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{json_body, IdPath};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Book, BookInput, BookOrdering, BookQuery};
use crate::services::FieldErrors;

/// Query parameters accepted by the book list
#[derive(Debug, Default, Deserialize)]
pub struct BookListParams {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication_year: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl BookListParams {
    /// Convert raw parameters into a typed query. Empty values are ignored.
    pub fn into_query(self) -> Result<BookQuery, FieldErrors> {
        let mut errors = FieldErrors::new();

        let author = match non_empty(self.author) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add(
                        "author",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
            None => None,
        };

        let publication_year = match non_empty(self.publication_year) {
            Some(raw) => match raw.parse::<i32>() {
                Ok(year) => Some(year),
                Err(_) => {
                    errors.add("publication_year", "Enter a number.");
                    None
                }
            },
            None => None,
        };

        errors.into_result()?;

        Ok(BookQuery {
            title: non_empty(self.title),
            author,
            publication_year,
            search_terms: self
                .search
                .as_deref()
                .map(BookQuery::split_search)
                .unwrap_or_default(),
            ordering: self
                .ordering
                .as_deref()
                .map(BookOrdering::parse_list)
                .unwrap_or_default(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Public book routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/books/", get(list_books))
        .route("/books/{id}/", get(get_book))
}

/// Book routes that require an authenticated session
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/books/", post(create_book))
        .route("/books/create/", post(create_book))
        .route("/books/{id}/update/", put(update_book).patch(partial_update_book))
        .route("/books/{id}/delete/", delete(delete_book))
}

/// GET /api/books/ - List books
async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<BookListParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let query = params
        .into_query()
        .map_err(|errors| ApiError::invalid_fields(&errors))?;

    let books = state.catalog_service.list_books(&query).await?;
    Ok(Json(books))
}

/// GET /api/books/{id}/ - Get a book
async fn get_book(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.catalog_service.get_book(id).await?))
}

/// POST /api/books/create/ - Create a book
async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let input = json_body(payload)?;
    let book = state.catalog_service.create_book(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /api/books/{id}/update/ - Replace a book
async fn update_book(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let input = json_body(payload)?;
    Ok(Json(state.catalog_service.update_book(id, input, false).await?))
}

/// PATCH /api/books/{id}/update/ - Update some fields of a book
async fn partial_update_book(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let input = json_body(payload)?;
    Ok(Json(state.catalog_service.update_book(id, input, true).await?))
}

/// DELETE /api/books/{id}/delete/ - Delete a book
async fn delete_book(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog_service.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
