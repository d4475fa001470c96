//! User repository
//!
//! Database operations for users and their profiles. A profile row is
//! written together with every user so that each user has a role.

use super::{write_error, WriteError};
use crate::db::DynDatabasePool;
use crate::models::{User, UserProfile, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user and its profile
    async fn create(&self, user: &User) -> Result<User, WriteError>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by (normalized) email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Check whether an email is already registered
    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// List all users ordered by ID
    async fn list(&self) -> Result<Vec<User>>;

    /// Get the profile of a user
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>>;

    /// Change the role stored on a user's profile
    async fn set_role(&self, user_id: i64, role: UserRole) -> Result<Option<UserProfile>>;

    /// Delete a user (profile and sessions cascade)
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str = r#"
    u.id, u.email, u.password_hash, u.first_name, u.last_name, u.date_of_birth,
    u.profile_photo, u.is_active, u.is_staff, u.is_superuser, u.date_joined,
    u.updated_at, COALESCE(p.role, 'member') AS role
"#;

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User, WriteError> {
        create_user(self.pool.sqlite(), user).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users u LEFT JOIN user_profiles p ON p.user_id = u.id WHERE u.id = ?",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users u LEFT JOIN user_profiles p ON p.user_id = u.id WHERE u.email = ?",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get user by email")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check email")?;
        Ok(count > 0)
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users u LEFT JOIN user_profiles p ON p.user_id = u.id ORDER BY u.id",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list users")?;

        rows.iter().map(row_to_user).collect()
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>> {
        get_profile(self.pool.sqlite(), user_id).await
    }

    async fn set_role(&self, user_id: i64, role: UserRole) -> Result<Option<UserProfile>> {
        let pool = self.pool.sqlite();
        let result = sqlx::query("UPDATE user_profiles SET role = ? WHERE user_id = ?")
            .bind(role.to_string())
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to update user role")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to touch user")?;

        get_profile(pool, user_id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count users")?;
        Ok(count)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user(pool: &SqlitePool, user: &User) -> Result<User, WriteError> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, date_of_birth,
                           profile_photo, is_active, is_staff, is_superuser, date_joined, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.date_of_birth)
    .bind(&user.profile_photo)
    .bind(user.is_active)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| write_error(e, "Failed to create user"))?;

    let id = result.last_insert_rowid();

    sqlx::query("INSERT INTO user_profiles (user_id, role) VALUES (?, ?)")
        .bind(id)
        .bind(user.role.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to create user profile")?;

    tx.commit().await.context("Failed to commit user")?;

    Ok(User {
        id,
        date_joined: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_profile(pool: &SqlitePool, user_id: i64) -> Result<Option<UserProfile>> {
    let row = sqlx::query("SELECT id, user_id, role FROM user_profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user profile")?;

    match row {
        Some(row) => {
            let role_str: String = row.get("role");
            let role = UserRole::from_str(&role_str)
                .with_context(|| format!("Invalid role in database: {}", role_str))?;
            Ok(Some(UserProfile {
                id: row.get("id"),
                user_id: row.get("user_id"),
                role,
            }))
        }
        None => Ok(None),
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        date_of_birth: row.get("date_of_birth"),
        profile_photo: row.get("profile_photo"),
        is_active: row.get("is_active"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        role,
        date_joined: row.get("date_joined"),
        updated_at: row.get("updated_at"),
    })
}
