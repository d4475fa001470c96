//! Author repository
//!
//! Database operations for authors. Deleting an author cascades to their
//! books at the schema level.

use super::{write_error, WriteError};
use crate::db::DynDatabasePool;
use crate::models::Author;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Create a new author
    async fn create(&self, name: &str) -> Result<Author, WriteError>;

    /// Get author by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    /// Get author by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Author>>;

    /// List all authors ordered by ID
    async fn list(&self) -> Result<Vec<Author>>;

    /// Rename an author, returning `None` if it does not exist
    async fn update(&self, id: i64, name: &str) -> Result<Option<Author>, WriteError>;

    /// Delete an author, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    /// Create a new SQLx author repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, name: &str) -> Result<Author, WriteError> {
        let result = sqlx::query("INSERT INTO authors (name) VALUES (?)")
            .bind(name)
            .execute(self.pool.sqlite())
            .await
            .map_err(|e| write_error(e, "Failed to create author"))?;

        Ok(Author {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT id, name FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get author by ID")?;

        Ok(row.as_ref().map(row_to_author))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT id, name FROM authors WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get author by name")?;

        Ok(row.as_ref().map(row_to_author))
    }

    async fn list(&self) -> Result<Vec<Author>> {
        let rows = sqlx::query("SELECT id, name FROM authors ORDER BY id")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list authors")?;

        Ok(rows.iter().map(row_to_author).collect())
    }

    async fn update(&self, id: i64, name: &str) -> Result<Option<Author>, WriteError> {
        let result = sqlx::query("UPDATE authors SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .map_err(|e| write_error(e, "Failed to update author"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(Author {
            id,
            name: name.to_string(),
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete author")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_author(row: &sqlx::sqlite::SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
    }
}
