//! User service
//!
//! Registration, login/logout, session validation and user administration.
//! Users are identified by email. Every new user gets a profile whose role
//! defaults to member; superusers get the admin role.

use crate::db::repositories::{SessionRepository, UserRepository, WriteError};
use crate::models::{CreateUserInput, Session, User, UserRole, MAX_SESSION_LIFETIME_DAYS};
use crate::services::password::{hash_password, password_problems, verify_password};
use crate::services::validation::{FieldErrors, REQUIRED};
use anyhow::Context;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials or inactive account)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration.
    ///
    /// The lifetime is clamped to `1..=MAX_SESSION_LIFETIME_DAYS`.
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: session_expiration_days.clamp(1, MAX_SESSION_LIFETIME_DAYS),
        }
    }

    /// Session lifetime in seconds, used for the cookie `Max-Age`
    pub fn session_max_age_seconds(&self) -> i64 {
        self.session_expiration_days.saturating_mul(24 * 60 * 60)
    }

    /// Register a new member account.
    ///
    /// All field problems are reported together. A taken email is reported
    /// as `UserExists` once the input is otherwise valid.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let mut errors = FieldErrors::new();

        let email = normalize_email(input.email.trim());
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        if input.password.is_empty() {
            errors.add("password", REQUIRED);
        } else {
            for problem in password_problems(&input.password, &email) {
                errors.add("password", problem);
            }
        }

        if input.password_confirm.is_empty() {
            errors.add("password_confirm", REQUIRED);
        } else if input.password != input.password_confirm {
            errors.add("password_confirm", "The two password fields didn't match.");
        }

        let date_of_birth = match input.date_of_birth.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add(
                        "date_of_birth",
                        "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
                    );
                    None
                }
            },
        };

        errors
            .into_result()
            .map_err(UserServiceError::ValidationError)?;

        self.create_user(CreateUserInput {
            email,
            password: input.password,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            date_of_birth,
            ..Default::default()
        })
        .await
    }

    /// Create a user and their profile.
    ///
    /// The email is required and normalized; the password is hashed. No
    /// password rules are applied here.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let email = normalize_email(input.email.trim());
        if email.is_empty() {
            return Err(UserServiceError::ValidationError(FieldErrors::single(
                "email",
                "Users must have an email address",
            )));
        }

        if self
            .user_repo
            .exists_by_email(&email)
            .await
            .context("Failed to check email")?
        {
            return Err(email_taken(&email));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let mut user = User::new(email, password_hash);
        user.first_name = input.first_name;
        user.last_name = input.last_name;
        user.date_of_birth = input.date_of_birth;
        user.is_staff = input.is_staff;
        user.is_superuser = input.is_superuser;
        user.role = input.role.unwrap_or_default();

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(WriteError::Duplicate) => return Err(email_taken(&user.email)),
            Err(WriteError::Other(e)) => {
                return Err(UserServiceError::InternalError(e.context("Failed to create user")))
            }
        };

        tracing::info!("Created user {} ({})", created.id, created.role);
        Ok(created)
    }

    /// Create a superuser: staff, superuser and the admin role.
    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        self.create_user(CreateUserInput {
            email: email.to_string(),
            password: password.to_string(),
            is_staff: true,
            is_superuser: true,
            role: Some(UserRole::Admin),
            ..Default::default()
        })
        .await
    }

    /// Create the configured superuser unless that email already exists.
    ///
    /// Returns `true` when a user was created.
    pub async fn ensure_superuser(
        &self,
        email: &str,
        password: &str,
    ) -> Result<bool, UserServiceError> {
        let email = normalize_email(email.trim());
        if self
            .user_repo
            .exists_by_email(&email)
            .await
            .context("Failed to check email")?
        {
            return Ok(false);
        }
        self.create_superuser(&email, password).await?;
        Ok(true)
    }

    /// Login with email and password, creating a new session.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let email = normalize_email(input.email.trim());
        let user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        if !user.is_active {
            return Err(UserServiceError::AuthenticationError(
                "This account is inactive.".to_string(),
            ));
        }

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Create a session for an existing user, e.g. right after registration
    pub async fn start_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        self.create_session(user_id).await
    }

    /// Validate a session token and return the associated user.
    ///
    /// Returns `None` if the session doesn't exist, has expired or belongs
    /// to an inactive user. Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(|u| u.is_active))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// List all users
    pub async fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    /// Change a user's role
    pub async fn set_role(&self, user_id: i64, role: UserRole) -> Result<User, UserServiceError> {
        self.user_repo
            .set_role(user_id, role)
            .await
            .context("Failed to set role")?
            .ok_or(UserServiceError::UserNotFound(user_id))?;

        tracing::info!("User {} is now {}", user_id, role);
        self.get_by_id(user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound(user_id))
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let lifetime = Duration::try_days(self.session_expiration_days)
            .context("Session lifetime out of range")?;
        let session = Session::new(user_id, lifetime);

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

/// Lower-case the domain part of an email address, keeping the local part.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn email_taken(email: &str) -> UserServiceError {
    UserServiceError::UserExists(format!("Email '{}' is already registered", email))
}

fn is_valid_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Input for user registration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
}

impl RegisterInput {
    /// Create a registration input with matching password fields
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            email: email.into(),
            password_confirm: password.clone(),
            password,
            ..Default::default()
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    /// Create a new login input
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}
