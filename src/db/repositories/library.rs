//! Library repository
//!
//! Database operations for libraries, their book holdings and their
//! librarian. A library has at most one librarian, enforced by a unique
//! index on `librarians.library_id`.

use super::{write_error, WriteError};
use crate::db::DynDatabasePool;
use crate::models::{Librarian, Library};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Library repository trait
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Create a new library
    async fn create(&self, name: &str) -> Result<Library, WriteError>;

    /// Get library by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Library>>;

    /// Get library by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Library>>;

    /// List all libraries ordered by ID
    async fn list(&self) -> Result<Vec<Library>>;

    /// Delete a library, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Add a book to a library's holdings. Adding twice is a no-op.
    async fn add_book(&self, library_id: i64, book_id: i64) -> Result<()>;

    /// Remove a book from a library, returning whether it was held
    async fn remove_book(&self, library_id: i64, book_id: i64) -> Result<bool>;

    /// Get the librarian of a library
    async fn get_librarian(&self, library_id: i64) -> Result<Option<Librarian>>;

    /// Assign a librarian to a library, replacing the name of an existing one
    async fn set_librarian(&self, library_id: i64, name: &str) -> Result<Librarian>;
}

/// SQLx-based library repository implementation
pub struct SqlxLibraryRepository {
    pool: DynDatabasePool,
}

impl SqlxLibraryRepository {
    /// Create a new SQLx library repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LibraryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LibraryRepository for SqlxLibraryRepository {
    async fn create(&self, name: &str) -> Result<Library, WriteError> {
        let result = sqlx::query("INSERT INTO libraries (name) VALUES (?)")
            .bind(name)
            .execute(self.pool.sqlite())
            .await
            .map_err(|e| write_error(e, "Failed to create library"))?;

        Ok(Library {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Library>> {
        let row = sqlx::query("SELECT id, name FROM libraries WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get library by ID")?;

        Ok(row.as_ref().map(row_to_library))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Library>> {
        let row = sqlx::query("SELECT id, name FROM libraries WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get library by name")?;

        Ok(row.as_ref().map(row_to_library))
    }

    async fn list(&self) -> Result<Vec<Library>> {
        let rows = sqlx::query("SELECT id, name FROM libraries ORDER BY id")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list libraries")?;

        Ok(rows.iter().map(row_to_library).collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM libraries WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete library")?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_book(&self, library_id: i64, book_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO library_books (library_id, book_id) VALUES (?, ?)")
            .bind(library_id)
            .bind(book_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to add book to library")?;

        Ok(())
    }

    async fn remove_book(&self, library_id: i64, book_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM library_books WHERE library_id = ? AND book_id = ?")
            .bind(library_id)
            .bind(book_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to remove book from library")?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_librarian(&self, library_id: i64) -> Result<Option<Librarian>> {
        let row = sqlx::query("SELECT id, name, library_id FROM librarians WHERE library_id = ?")
            .bind(library_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get librarian")?;

        Ok(row.as_ref().map(row_to_librarian))
    }

    async fn set_librarian(&self, library_id: i64, name: &str) -> Result<Librarian> {
        let row = sqlx::query(
            r#"
            INSERT INTO librarians (name, library_id) VALUES (?, ?)
            ON CONFLICT(library_id) DO UPDATE SET name = excluded.name
            RETURNING id, name, library_id
            "#,
        )
        .bind(name)
        .bind(library_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to set librarian")?;

        Ok(row_to_librarian(&row))
    }
}

fn row_to_library(row: &sqlx::sqlite::SqliteRow) -> Library {
    Library {
        id: row.get("id"),
        name: row.get("name"),
    }
}

fn row_to_librarian(row: &sqlx::sqlite::SqliteRow) -> Librarian {
    Librarian {
        id: row.get("id"),
        name: row.get("name"),
        library_id: row.get("library_id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, SqlxLibraryRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool.execute("INSERT INTO authors (id, name) VALUES (1, 'Italo Calvino')")
            .await
            .unwrap();
        let book_id = sqlx::query(
            "INSERT INTO books (title, publication_year, author_id) VALUES ('Invisible Cities', 1972, 1)",
        )
        .execute(pool.sqlite())
        .await
        .unwrap()
        .last_insert_rowid();
        let repo = SqlxLibraryRepository::new(pool.clone());
        (pool, repo, book_id)
    }

    async fn holdings(pool: &DynDatabasePool, library_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM library_books WHERE library_id = ?")
            .bind(library_id)
            .fetch_one(pool.sqlite())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup_library() {
        let (_pool, repo, _) = setup().await;

        let created = repo.create("Central").await.unwrap();

        assert_eq!(repo.get_by_id(created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(repo.get_by_name("Central").await.unwrap(), Some(created));
        assert!(repo.get_by_name("Nowhere").await.unwrap().is_none());
        assert!(matches!(repo.create("Central").await, Err(WriteError::Duplicate)));
    }

    #[tokio::test]
    async fn test_add_book_is_idempotent() {
        let (pool, repo, book_id) = setup().await;
        let library = repo.create("Central").await.unwrap();

        repo.add_book(library.id, book_id).await.unwrap();
        repo.add_book(library.id, book_id).await.unwrap();

        assert_eq!(holdings(&pool, library.id).await, 1);
        assert!(repo.remove_book(library.id, book_id).await.unwrap());
        assert!(!repo.remove_book(library.id, book_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_librarian_replaces_name() {
        let (_pool, repo, _) = setup().await;
        let library = repo.create("Central").await.unwrap();

        let first = repo.set_librarian(library.id, "Ada").await.unwrap();
        let second = repo.set_librarian(library.id, "Grace").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Grace");
        assert_eq!(repo.get_librarian(library.id).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_delete_library_cascades() {
        let (pool, repo, book_id) = setup().await;
        let library = repo.create("Central").await.unwrap();
        repo.add_book(library.id, book_id).await.unwrap();
        repo.set_librarian(library.id, "Ada").await.unwrap();

        assert!(repo.delete(library.id).await.unwrap());

        assert_eq!(holdings(&pool, library.id).await, 0);
        assert!(repo.get_librarian(library.id).await.unwrap().is_none());
    }
}
