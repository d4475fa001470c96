//! Library service
//!
//! Libraries, their holdings and their librarian, plus the by-name lookups
//! used by the query endpoints.

use crate::db::repositories::{BookRepository, LibraryRepository, WriteError};
use crate::models::{
    Book, Librarian, LibrarianInput, Library, LibraryBookInput, LibraryDetail, LibraryInput,
};
use crate::services::validation::{already_exists, invalid_pk, too_long, FieldErrors, BLANK, REQUIRED};
use anyhow::Context;
use std::sync::Arc;

/// Maximum length of library and librarian names
pub const MAX_NAME_LENGTH: usize = 255;

/// Error types for library operations
#[derive(Debug, thiserror::Error)]
pub enum LibraryServiceError {
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

/// Service for libraries and librarians
pub struct LibraryService {
    library_repo: Arc<dyn LibraryRepository>,
    book_repo: Arc<dyn BookRepository>,
}

impl LibraryService {
    /// Create a new library service
    pub fn new(library_repo: Arc<dyn LibraryRepository>, book_repo: Arc<dyn BookRepository>) -> Self {
        Self {
            library_repo,
            book_repo,
        }
    }

    /// List all libraries with their books and librarian
    pub async fn list_libraries(&self) -> Result<Vec<LibraryDetail>, LibraryServiceError> {
        let libraries = self
            .library_repo
            .list()
            .await
            .context("Failed to list libraries")?;

        let mut result = Vec::with_capacity(libraries.len());
        for library in libraries {
            result.push(self.detail(library).await?);
        }
        Ok(result)
    }

    /// Get one library with its books and librarian
    pub async fn get_library(&self, id: i64) -> Result<LibraryDetail, LibraryServiceError> {
        let library = self.find_library(id).await?;
        self.detail(library).await
    }

    /// Create a library with a unique name
    pub async fn create_library(
        &self,
        input: LibraryInput,
    ) -> Result<LibraryDetail, LibraryServiceError> {
        let name = validate_name(input.name.as_deref())?;

        let taken = self
            .library_repo
            .get_by_name(&name)
            .await
            .context("Failed to check library name")?
            .is_some();
        if taken {
            return Err(duplicate_library_name());
        }

        // The UNIQUE index settles a race with a concurrent create
        let library = match self.library_repo.create(&name).await {
            Ok(library) => library,
            Err(WriteError::Duplicate) => return Err(duplicate_library_name()),
            Err(WriteError::Other(e)) => {
                return Err(LibraryServiceError::InternalError(
                    e.context("Failed to create library"),
                ))
            }
        };

        tracing::info!("Created library {} ({:?})", library.id, library.name);
        Ok(LibraryDetail::new(library, Vec::new(), None))
    }

    /// Delete a library; its holdings and librarian go with it
    pub async fn delete_library(&self, id: i64) -> Result<(), LibraryServiceError> {
        let deleted = self
            .library_repo
            .delete(id)
            .await
            .context("Failed to delete library")?;
        if !deleted {
            return Err(LibraryServiceError::NotFound("Library"));
        }
        tracing::info!("Deleted library {}", id);
        Ok(())
    }

    /// Add a book to a library's holdings
    pub async fn add_book(
        &self,
        library_id: i64,
        input: LibraryBookInput,
    ) -> Result<LibraryDetail, LibraryServiceError> {
        let library = self.find_library(library_id).await?;

        let book_id = match input.book {
            Some(id) => id,
            None => {
                return Err(LibraryServiceError::ValidationError(FieldErrors::single(
                    "book", REQUIRED,
                )))
            }
        };
        let exists = self
            .book_repo
            .get_by_id(book_id)
            .await
            .context("Failed to check book")?
            .is_some();
        if !exists {
            return Err(LibraryServiceError::ValidationError(FieldErrors::single(
                "book",
                invalid_pk(book_id),
            )));
        }

        self.library_repo
            .add_book(library.id, book_id)
            .await
            .context("Failed to add book to library")?;
        self.detail(library).await
    }

    /// Remove a book from a library's holdings
    pub async fn remove_book(
        &self,
        library_id: i64,
        book_id: i64,
    ) -> Result<LibraryDetail, LibraryServiceError> {
        let library = self.find_library(library_id).await?;

        let removed = self
            .library_repo
            .remove_book(library.id, book_id)
            .await
            .context("Failed to remove book from library")?;
        if !removed {
            return Err(LibraryServiceError::NotFound("Book"));
        }
        self.detail(library).await
    }

    /// Assign a librarian to a library, renaming the current one if present
    pub async fn set_librarian(
        &self,
        library_id: i64,
        input: LibrarianInput,
    ) -> Result<Librarian, LibraryServiceError> {
        let library = self.find_library(library_id).await?;
        let name = validate_name(input.name.as_deref())?;

        let librarian = self
            .library_repo
            .set_librarian(library.id, &name)
            .await
            .context("Failed to set librarian")?;

        tracing::info!("Library {} librarian set to {:?}", library.id, librarian.name);
        Ok(librarian)
    }

    /// Books held by the library with this exact name; empty if unknown
    pub async fn books_in_library(&self, library_name: &str) -> Result<Vec<Book>, LibraryServiceError> {
        match self.find_by_name(library_name).await? {
            Some(library) => Ok(self
                .book_repo
                .list_by_library(library.id)
                .await
                .context("Failed to list library books")?),
            None => Ok(Vec::new()),
        }
    }

    /// Librarian of the library with this exact name, if any
    pub async fn librarian_for_library(
        &self,
        library_name: &str,
    ) -> Result<Option<Librarian>, LibraryServiceError> {
        match self.find_by_name(library_name).await? {
            Some(library) => Ok(self
                .library_repo
                .get_librarian(library.id)
                .await
                .context("Failed to get librarian")?),
            None => Ok(None),
        }
    }

    async fn find_library(&self, id: i64) -> Result<Library, LibraryServiceError> {
        self.library_repo
            .get_by_id(id)
            .await
            .context("Failed to get library")?
            .ok_or(LibraryServiceError::NotFound("Library"))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Library>, LibraryServiceError> {
        Ok(self
            .library_repo
            .get_by_name(name)
            .await
            .context("Failed to get library by name")?)
    }

    async fn detail(&self, library: Library) -> Result<LibraryDetail, LibraryServiceError> {
        let books = self
            .book_repo
            .list_by_library(library.id)
            .await
            .context("Failed to list library books")?;
        let librarian = self
            .library_repo
            .get_librarian(library.id)
            .await
            .context("Failed to get librarian")?;
        Ok(LibraryDetail::new(library, books, librarian))
    }
}

fn validate_name(name: Option<&str>) -> Result<String, LibraryServiceError> {
    let message = match name.map(str::trim) {
        None => REQUIRED.to_string(),
        Some("") => BLANK.to_string(),
        Some(name) if name.chars().count() > MAX_NAME_LENGTH => too_long(MAX_NAME_LENGTH),
        Some(name) => return Ok(name.to_string()),
    };
    Err(LibraryServiceError::ValidationError(FieldErrors::single(
        "name", message,
    )))
}

fn duplicate_library_name() -> LibraryServiceError {
    LibraryServiceError::ValidationError(FieldErrors::single(
        "name",
        already_exists("library", "name"),
    ))
}
