//! Library API endpoints
//!
//! - GET /api/libraries/ - List libraries with books and librarian
//! - GET /api/libraries/{id}/ - Get a library
//! - POST /api/libraries/ - Create a library (librarian or admin)
//! - POST /api/libraries/{id}/books/ - Add a book (librarian or admin)
//! - DELETE /api/libraries/{id}/books/{book_id}/ - Remove a book (librarian or admin)
//! - PUT /api/libraries/{id}/librarian/ - Assign the librarian (admin)
//! - DELETE /api/libraries/{id}/ - Delete a library (admin)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::common::{json_body, IdPath};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Librarian, LibrarianInput, LibraryBookInput, LibraryDetail, LibraryInput};

/// Public library routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/libraries/", get(list_libraries))
        .route("/libraries/{id}/", get(get_library))
}

/// Routes for librarians and admins
pub fn librarian_router() -> Router<AppState> {
    Router::new()
        .route("/libraries/", post(create_library))
        .route("/libraries/{id}/books/", post(add_book))
        .route("/libraries/{id}/books/{book_id}/", delete(remove_book))
}

/// Admin-only routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/libraries/{id}/", delete(delete_library))
        .route("/libraries/{id}/librarian/", put(set_librarian))
}

/// GET /api/libraries/ - List libraries
async fn list_libraries(State(state): State<AppState>) -> Result<Json<Vec<LibraryDetail>>, ApiError> {
    Ok(Json(state.library_service.list_libraries().await?))
}

/// GET /api/libraries/{id}/ - Get a library
async fn get_library(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<Json<LibraryDetail>, ApiError> {
    Ok(Json(state.library_service.get_library(id).await?))
}

/// POST /api/libraries/ - Create a library
async fn create_library(
    State(state): State<AppState>,
    payload: Result<Json<LibraryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<LibraryDetail>), ApiError> {
    let input = json_body(payload)?;
    let library = state.library_service.create_library(input).await?;
    Ok((StatusCode::CREATED, Json(library)))
}

/// POST /api/libraries/{id}/books/ - Add a book to a library
async fn add_book(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    payload: Result<Json<LibraryBookInput>, JsonRejection>,
) -> Result<Json<LibraryDetail>, ApiError> {
    let input = json_body(payload)?;
    Ok(Json(state.library_service.add_book(id, input).await?))
}

/// DELETE /api/libraries/{id}/books/{book_id}/ - Remove a book from a library
async fn remove_book(
    State(state): State<AppState>,
    IdPath((id, book_id)): IdPath<(i64, i64)>,
) -> Result<Json<LibraryDetail>, ApiError> {
    Ok(Json(state.library_service.remove_book(id, book_id).await?))
}

/// PUT /api/libraries/{id}/librarian/ - Assign the librarian
async fn set_librarian(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    payload: Result<Json<LibrarianInput>, JsonRejection>,
) -> Result<Json<Librarian>, ApiError> {
    let input = json_body(payload)?;
    Ok(Json(state.library_service.set_librarian(id, input).await?))
}

/// DELETE /api/libraries/{id}/ - Delete a library
async fn delete_library(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.library_service.delete_library(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
