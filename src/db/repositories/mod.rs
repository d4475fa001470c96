//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity.

pub mod author;
pub mod book;
pub mod library;
pub mod session;
pub mod user;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use book::{BookRepository, SqlxBookRepository};
pub use library::{LibraryRepository, SqlxLibraryRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Failure of a write that can collide with a UNIQUE column
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Another row already holds the value
    #[error("Duplicate value for a unique column")]
    Duplicate,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Map a failed write, singling out UNIQUE constraint violations
pub(crate) fn write_error(err: sqlx::Error, operation: &'static str) -> WriteError {
    if is_unique_violation(&err) {
        WriteError::Duplicate
    } else {
        WriteError::Other(anyhow::Error::new(err).context(operation))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
