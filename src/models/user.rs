//! User model
//!
//! Users log in with their email address; there is no username. Each user has
//! a profile carrying their catalog role, and the role decides which book
//! permissions they hold.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, login identifier)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Path of the uploaded profile photo, if any
    pub profile_photo: Option<String>,
    /// Inactive users cannot log in
    pub is_active: bool,
    pub is_staff: bool,
    /// Superusers hold every permission regardless of role
    pub is_superuser: bool,
    /// Role from the user's profile
    pub role: UserRole,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new regular user with the given, already hashed, password.
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            email,
            password_hash,
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: None,
            profile_photo: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            role: UserRole::Member,
            date_joined: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator (by role or superuser flag)
    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.role == UserRole::Admin
    }

    /// Check if the user holds a permission
    pub fn has_perm(&self, perm: Permission) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_superuser || self.role.permissions().contains(&perm)
    }

    /// Full name, falling back to the email when no name is set
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Catalog role stored on the user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access, including user and library administration
    Admin,
    /// Manages books and library holdings
    Librarian,
    /// Read-only access
    Member,
}

impl UserRole {
    /// Book permissions granted by this role
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin | UserRole::Librarian => &Permission::ALL,
            UserRole::Member => &[],
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Librarian => write!(f, "librarian"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "librarian" => Ok(UserRole::Librarian),
            "member" => Ok(UserRole::Member),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Book permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "can_add_book")]
    AddBook,
    #[serde(rename = "can_change_book")]
    ChangeBook,
    #[serde(rename = "can_delete_book")]
    DeleteBook,
}

impl Permission {
    pub const ALL: [Permission; 3] = [
        Permission::AddBook,
        Permission::ChangeBook,
        Permission::DeleteBook,
    ];

    /// Permission codename, e.g. `can_add_book`
    pub fn codename(&self) -> &'static str {
        match self {
            Permission::AddBook => "can_add_book",
            Permission::ChangeBook => "can_change_book",
            Permission::DeleteBook => "can_delete_book",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

/// Profile attached one-to-one to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    /// Owning user ID, serialized as `user`
    #[serde(rename = "user")]
    pub user_id: i64,
    pub role: UserRole,
}

/// Input for creating a user (before password hashing)
#[derive(Debug, Clone, Default)]
pub struct CreateUserInput {
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Profile role, defaults to member
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: UserRole) -> User {
        let mut user = User::new("reader@example.com".to_string(), "hash".to_string());
        user.role = role;
        user
    }

    #[test]
    fn test_user_new_defaults() {
        let user = User::new("reader@example.com".to_string(), "hash".to_string());
        assert_eq!(user.id, 0);
        assert_eq!(user.role, UserRole::Member);
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
    }

    #[test]
    fn test_role_permissions() {
        for perm in Permission::ALL {
            assert!(user_with_role(UserRole::Admin).has_perm(perm));
            assert!(user_with_role(UserRole::Librarian).has_perm(perm));
            assert!(!user_with_role(UserRole::Member).has_perm(perm));
        }
    }

    #[test]
    fn test_superuser_has_every_permission() {
        let mut user = user_with_role(UserRole::Member);
        user.is_superuser = true;
        assert!(user.is_admin());
        assert!(user.has_perm(Permission::DeleteBook));
    }

    #[test]
    fn test_inactive_user_has_no_permissions() {
        let mut user = user_with_role(UserRole::Admin);
        user.is_active = false;
        assert!(!user.has_perm(Permission::AddBook));
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("Librarian").unwrap(), UserRole::Librarian);
        assert_eq!(UserRole::from_str("MEMBER").unwrap(), UserRole::Member);
        assert!(UserRole::from_str("editor").is_err());
    }

    #[test]
    fn test_user_role_display_round_trips() {
        for role in [UserRole::Admin, UserRole::Librarian, UserRole::Member] {
            assert_eq!(UserRole::from_str(&role.to_string()).unwrap(), role);
        }
    }

    #[test]
    fn test_permission_codenames() {
        assert_eq!(Permission::AddBook.to_string(), "can_add_book");
        assert_eq!(
            serde_json::to_string(&Permission::ChangeBook).unwrap(),
            "\"can_change_book\""
        );
    }

    #[test]
    fn test_display_name() {
        let mut user = user_with_role(UserRole::Member);
        assert_eq!(user.display_name(), "reader@example.com");
        user.first_name = "Ada".to_string();
        user.last_name = "Lovelace".to_string();
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = user_with_role(UserRole::Member);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "member");
    }
}
