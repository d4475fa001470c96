//! Catalog service
//!
//! Business rules for books and authors: validation of book input (title,
//! publication year, author reference), author uniqueness, nested author
//! representations and the books-by-author lookup.

use crate::db::repositories::{AuthorRepository, BookRepository, WriteError};
use crate::models::{
    Author, AuthorInput, AuthorWithBooks, Book, BookInput, BookQuery, BookWithAuthor,
    MAX_TITLE_LENGTH,
};
use crate::services::validation::{already_exists, invalid_pk, too_long, FieldErrors, BLANK, REQUIRED};
use anyhow::Context;
use chrono::{Datelike, Utc};
use std::sync::Arc;

/// Maximum length of an author name
pub const MAX_AUTHOR_NAME_LENGTH: usize = 255;

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    /// Input failed validation
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Requested object does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service for books and authors
pub struct CatalogService {
    book_repo: Arc<dyn BookRepository>,
    author_repo: Arc<dyn AuthorRepository>,
}

impl CatalogService {
    /// Create a new catalog service
    pub fn new(book_repo: Arc<dyn BookRepository>, author_repo: Arc<dyn AuthorRepository>) -> Self {
        Self {
            book_repo,
            author_repo,
        }
    }

    // ========================================================================
    // Books
    // ========================================================================

    /// List books matching the query
    pub async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>, CatalogServiceError> {
        Ok(self.book_repo.list(query).await.context("Failed to list books")?)
    }

    /// List every book with its author name
    pub async fn list_books_with_authors(&self) -> Result<Vec<BookWithAuthor>, CatalogServiceError> {
        Ok(self
            .book_repo
            .list_with_authors()
            .await
            .context("Failed to list books")?)
    }

    /// Get a book by ID
    pub async fn get_book(&self, id: i64) -> Result<Book, CatalogServiceError> {
        self.book_repo
            .get_by_id(id)
            .await
            .context("Failed to get book")?
            .ok_or(CatalogServiceError::NotFound("Book"))
    }

    /// Create a book. Every field is required.
    pub async fn create_book(&self, input: BookInput) -> Result<Book, CatalogServiceError> {
        let (title, year, author) = self.validate_book(&input, None).await?;

        let book = self
            .book_repo
            .create(&title, year, author)
            .await
            .context("Failed to create book")?;

        tracing::info!("Created book {} ({:?})", book.id, book.title);
        Ok(book)
    }

    /// Update a book.
    ///
    /// With `partial` unset every field is required (PUT); otherwise only
    /// the given fields change (PATCH). A missing book is reported before
    /// any validation.
    pub async fn update_book(
        &self,
        id: i64,
        input: BookInput,
        partial: bool,
    ) -> Result<Book, CatalogServiceError> {
        let existing = self.get_book(id).await?;
        let fallback = partial.then_some(&existing);
        let (title, publication_year, author_id) = self.validate_book(&input, fallback).await?;

        let book = Book {
            id,
            title,
            publication_year,
            author_id,
        };
        self.book_repo
            .update(&book)
            .await
            .context("Failed to update book")?
            .ok_or(CatalogServiceError::NotFound("Book"))
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i64) -> Result<(), CatalogServiceError> {
        let deleted = self
            .book_repo
            .delete(id)
            .await
            .context("Failed to delete book")?;
        if !deleted {
            return Err(CatalogServiceError::NotFound("Book"));
        }
        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    /// Books written by the author with this exact name; empty if unknown
    pub async fn books_by_author(&self, author_name: &str) -> Result<Vec<Book>, CatalogServiceError> {
        let author = self
            .author_repo
            .get_by_name(author_name)
            .await
            .context("Failed to get author")?;

        match author {
            Some(author) => Ok(self
                .book_repo
                .list_by_author(author.id)
                .await
                .context("Failed to list books by author")?),
            None => Ok(Vec::new()),
        }
    }

    /// Validate book input, filling absent fields from `fallback` when given.
    async fn validate_book(
        &self,
        input: &BookInput,
        fallback: Option<&Book>,
    ) -> Result<(String, i32, i64), CatalogServiceError> {
        let mut errors = FieldErrors::new();

        let title = match (&input.title, fallback) {
            (Some(title), _) => {
                let title = title.trim();
                if title.is_empty() {
                    errors.add("title", BLANK);
                } else if title.chars().count() > MAX_TITLE_LENGTH {
                    errors.add("title", too_long(MAX_TITLE_LENGTH));
                }
                title.to_string()
            }
            (None, Some(book)) => book.title.clone(),
            (None, None) => {
                errors.add("title", REQUIRED);
                String::new()
            }
        };

        let publication_year = match (input.publication_year, fallback) {
            (Some(year), _) => {
                if year > Utc::now().year() {
                    errors.add("publication_year", "Publication year cannot be in the future.");
                }
                year
            }
            (None, Some(book)) => book.publication_year,
            (None, None) => {
                errors.add("publication_year", REQUIRED);
                0
            }
        };

        let author_id = match (input.author, fallback) {
            (Some(author_id), _) => {
                let exists = self
                    .author_repo
                    .get_by_id(author_id)
                    .await
                    .context("Failed to check author")?
                    .is_some();
                if !exists {
                    errors.add("author", invalid_pk(author_id));
                }
                author_id
            }
            (None, Some(book)) => book.author_id,
            (None, None) => {
                errors.add("author", REQUIRED);
                0
            }
        };

        errors
            .into_result()
            .map_err(CatalogServiceError::ValidationError)?;
        Ok((title, publication_year, author_id))
    }

    // ========================================================================
    // Authors
    // ========================================================================

    /// List authors with their books
    pub async fn list_authors(&self) -> Result<Vec<AuthorWithBooks>, CatalogServiceError> {
        let authors = self
            .author_repo
            .list()
            .await
            .context("Failed to list authors")?;

        let mut result = Vec::with_capacity(authors.len());
        for author in authors {
            result.push(self.with_books(author).await?);
        }
        Ok(result)
    }

    /// Get an author with their books
    pub async fn get_author(&self, id: i64) -> Result<AuthorWithBooks, CatalogServiceError> {
        let author = self.find_author(id).await?;
        self.with_books(author).await
    }

    /// Create an author
    pub async fn create_author(
        &self,
        input: AuthorInput,
    ) -> Result<AuthorWithBooks, CatalogServiceError> {
        let name = self.validate_author_name(input.name.as_deref(), None).await?;

        let author = self
            .author_repo
            .create(&name)
            .await
            .map_err(|e| author_write_error(e, "Failed to create author"))?;

        tracing::info!("Created author {} ({:?})", author.id, author.name);
        Ok(AuthorWithBooks::new(author, Vec::new()))
    }

    /// Update an author. With `partial` set a missing name keeps the old one.
    pub async fn update_author(
        &self,
        id: i64,
        input: AuthorInput,
        partial: bool,
    ) -> Result<AuthorWithBooks, CatalogServiceError> {
        let existing = self.find_author(id).await?;

        let name = match (input.name.as_deref(), partial) {
            (None, true) => existing.name.clone(),
            (name, _) => self.validate_author_name(name, Some(id)).await?,
        };

        let author = self
            .author_repo
            .update(id, &name)
            .await
            .map_err(|e| author_write_error(e, "Failed to update author"))?
            .ok_or(CatalogServiceError::NotFound("Author"))?;
        self.with_books(author).await
    }

    /// Delete an author together with their books
    pub async fn delete_author(&self, id: i64) -> Result<(), CatalogServiceError> {
        let deleted = self
            .author_repo
            .delete(id)
            .await
            .context("Failed to delete author")?;
        if !deleted {
            return Err(CatalogServiceError::NotFound("Author"));
        }
        tracing::info!("Deleted author {}", id);
        Ok(())
    }

    async fn find_author(&self, id: i64) -> Result<Author, CatalogServiceError> {
        self.author_repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
            .ok_or(CatalogServiceError::NotFound("Author"))
    }

    async fn with_books(&self, author: Author) -> Result<AuthorWithBooks, CatalogServiceError> {
        let books = self
            .book_repo
            .list_by_author(author.id)
            .await
            .context("Failed to list books by author")?;
        Ok(AuthorWithBooks::new(author, books))
    }

    /// Validate an author name; `current` is the ID of the author being
    /// renamed, which may keep its own name.
    async fn validate_author_name(
        &self,
        name: Option<&str>,
        current: Option<i64>,
    ) -> Result<String, CatalogServiceError> {
        let name = match name.map(str::trim) {
            None => return Err(name_error(REQUIRED)),
            Some("") => return Err(name_error(BLANK)),
            Some(name) if name.chars().count() > MAX_AUTHOR_NAME_LENGTH => {
                return Err(name_error(&too_long(MAX_AUTHOR_NAME_LENGTH)))
            }
            Some(name) => name,
        };

        let clash = self
            .author_repo
            .get_by_name(name)
            .await
            .context("Failed to check author name")?;
        if let Some(other) = clash {
            if Some(other.id) != current {
                return Err(name_error(&already_exists("author", "name")));
            }
        }

        Ok(name.to_string())
    }
}

/// A name taken between the check and the write reports like the check
fn author_write_error(err: WriteError, operation: &'static str) -> CatalogServiceError {
    match err {
        WriteError::Duplicate => name_error(&already_exists("author", "name")),
        WriteError::Other(e) => CatalogServiceError::InternalError(e.context(operation)),
    }
}

fn name_error(message: &str) -> CatalogServiceError {
    CatalogServiceError::ValidationError(FieldErrors::single("name", message))
}
