//! Shared API response types
//!
//! Catalog entities serialize directly from their models. Users go through
//! `UserResponse` so that only public fields leave the server.

use serde::{Deserialize, Serialize};

use crate::models::User;

/// Public view of a user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub profile_photo: Option<String>,
    pub role: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub permissions: Vec<String>,
    pub date_joined: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let permissions = crate::models::Permission::ALL
            .iter()
            .filter(|perm| user.has_perm(**perm))
            .map(|perm| perm.codename().to_string())
            .collect();

        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            date_of_birth: user.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            profile_photo: user.profile_photo,
            role: user.role.to_string(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            permissions,
            date_joined: user.date_joined.to_rfc3339(),
        }
    }
}

/// Response for successful registration or login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response for the health check
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    #[test]
    fn test_user_response_lists_permissions() {
        let mut user = User::new("lib@example.com".to_string(), "hash".to_string());
        user.role = UserRole::Librarian;

        let response = UserResponse::from(user);

        assert_eq!(response.role, "librarian");
        assert_eq!(
            response.permissions,
            vec!["can_add_book", "can_change_book", "can_delete_book"]
        );
    }

    #[test]
    fn test_member_has_no_permissions() {
        let user = User::new("member@example.com".to_string(), "hash".to_string());
        assert!(UserResponse::from(user).permissions.is_empty());
    }
}
