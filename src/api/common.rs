//! Common API utilities and shared types
//!
//! Body extraction that reports malformed JSON through the error envelope,
//! id path parameters that answer 404 when they don't parse,
//! and the session cookie helpers shared by the JSON and HTML auth flows.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    Json,
};
use serde::de::DeserializeOwned;

use super::middleware::ApiError;

/// Unwrap a JSON body, turning a rejection into a 400 validation error
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::validation_error(rejection.body_text())),
    }
}

/// Object ids taken from the path
///
/// A segment that isn't a valid id names no object, so it gets the same
/// 404 envelope as an id with no row behind it.
#[derive(Debug)]
pub struct IdPath<T>(pub T);

impl<T, S> FromRequestParts<S> for IdPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(IdPath(value)),
            Err(rejection) => {
                tracing::debug!("Unparseable path id: {}", rejection.body_text());
                Err(ApiError::not_found("Not found"))
            }
        }
    }
}

/// Headers setting the session cookie
pub fn session_cookie_headers(token: &str, max_age_seconds: i64) -> HeaderMap {
    cookie_headers(&format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age_seconds
    ))
}

/// Headers expiring the session cookie
pub fn clear_session_cookie_headers() -> HeaderMap {
    cookie_headers("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn cookie_headers(cookie: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    // Tokens are UUIDs, so the value is always a valid header
    if let Ok(value) = HeaderValue::from_str(cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    headers
}
