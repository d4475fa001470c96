//! Server-rendered pages
//!
//! The HTML side of the catalog: book list, library detail, the
//! permission-gated book forms, per-role landing pages and the
//! register/login/logout forms. Sessions are shared with the JSON API.

mod templates;
mod views;

#[cfg(test)]
mod tests;

use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    middleware as axum_middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};

use serde::de::DeserializeOwned;

use crate::api::middleware::{optional_auth, AppState};
use crate::services::{CatalogServiceError, LibraryServiceError, UserServiceError};

pub use templates::{page_context, CurrentUser, TemplateError, Templates};

/// Build the page router
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(views::index))
        .route("/books/", get(views::list_books))
        .route("/library/{id}/", get(views::library_detail))
        .route("/add_book/", get(views::add_book_form).post(views::add_book))
        .route(
            "/edit_book/{id}/",
            get(views::edit_book_form).post(views::edit_book),
        )
        .route(
            "/delete_book/{id}/",
            get(views::delete_book_confirm).post(views::delete_book),
        )
        .route("/admin/", get(views::admin_page))
        .route("/librarian/", get(views::librarian_page))
        .route("/member/", get(views::member_page))
        .route("/register/", get(views::register_form).post(views::register))
        .route("/login/", get(views::login_form).post(views::login))
        .route("/logout/", get(views::logout).post(views::logout))
        .route_layer(axum_middleware::from_fn_with_state(state, optional_auth))
}

/// Fallback for unknown paths
pub async fn not_found() -> Response {
    PageError::NotFound.into_response()
}

/// Object id from the page path; anything that doesn't parse is a 404
#[derive(Debug)]
pub struct PagePath<T>(pub T);

impl<T, S> FromRequestParts<S> for PagePath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PagePath(value))
            .map_err(|_| PageError::NotFound)
    }
}

/// Errors a page handler can end with
#[derive(Debug)]
pub enum PageError {
    /// Anonymous visitor; redirect to the login form, then back to `next`
    LoginRequired { next: String },
    /// Logged in without the required permission or role
    Forbidden,
    NotFound,
    Internal(anyhow::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::LoginRequired { next } => {
                Redirect::to(&format!("/login/?next={}", urlencoding::encode(&next)))
                    .into_response()
            }
            PageError::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(simple_page("403 Forbidden", "You do not have permission to view this page.")),
            )
                .into_response(),
            PageError::NotFound => (
                StatusCode::NOT_FOUND,
                Html(simple_page("404 Not Found", "The requested page does not exist.")),
            )
                .into_response(),
            PageError::Internal(e) => {
                tracing::error!("Page failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(simple_page("500 Server Error", "Something went wrong.")),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for PageError {
    fn from(e: anyhow::Error) -> Self {
        PageError::Internal(e)
    }
}

impl From<CatalogServiceError> for PageError {
    fn from(e: CatalogServiceError) -> Self {
        match e {
            CatalogServiceError::NotFound(_) => PageError::NotFound,
            other => PageError::Internal(other.into()),
        }
    }
}

impl From<LibraryServiceError> for PageError {
    fn from(e: LibraryServiceError) -> Self {
        match e {
            LibraryServiceError::NotFound(_) => PageError::NotFound,
            other => PageError::Internal(other.into()),
        }
    }
}

impl From<UserServiceError> for PageError {
    fn from(e: UserServiceError) -> Self {
        PageError::Internal(e.into())
    }
}

/// Minimal standalone page for error responses.
///
/// Rendered without Tera so that it works even when templates fail.
fn simple_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body>
    <h1>{title}</h1>
    <p>{message}</p>
    <p><a href="/books/">Back to books</a></p>
</body>
</html>"#
    )
}
