//! User administration endpoints (admin only)
//!
//! - GET /api/admin/users - List users
//! - PUT /api/admin/users/{id}/role - Change a user's role

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{json_body, IdPath};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::UserResponse;
use crate::models::UserRole;
use crate::services::validation::{FieldErrors, REQUIRED};

/// Request body for a role change
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: Option<String>,
}

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/role", put(update_role))
}

/// GET /api/admin/users - List users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.user_service.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// PUT /api/admin/users/{id}/role - Change a user's role
async fn update_role(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let body = json_body(payload)?;
    let role = parse_role(body.role.as_deref())
        .map_err(|errors| ApiError::invalid_fields(&errors))?;

    let user = state.user_service.set_role(id, role).await?;
    tracing::info!("Changed role of user {} to {}", user.email, role);

    Ok(Json(user.into()))
}

fn parse_role(value: Option<&str>) -> Result<UserRole, FieldErrors> {
    match value.map(str::trim) {
        None | Some("") => Err(FieldErrors::single("role", REQUIRED)),
        Some(value) => value.parse().map_err(|_| {
            FieldErrors::single(
                "role",
                format!("\"{}\" is not a valid choice.", value),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(Some("librarian")).unwrap(), UserRole::Librarian);
        assert_eq!(parse_role(Some(" Admin ")).unwrap(), UserRole::Admin);

        let errors = parse_role(Some("janitor")).unwrap_err();
        assert_eq!(
            errors.get("role").unwrap()[0],
            "\"janitor\" is not a valid choice."
        );

        let errors = parse_role(None).unwrap_err();
        assert!(errors.get("role").is_some());
    }
}
