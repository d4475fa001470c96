//! Data models
//!
//! Domain entities of the catalog (authors, books, libraries, librarians,
//! users and sessions) plus the input types accepted by the services.

mod author;
mod book;
mod library;
mod session;
mod user;

pub use author::{Author, AuthorInput, AuthorWithBooks};
pub use book::{
    Book, BookInput, BookOrderField, BookOrdering, BookQuery, BookWithAuthor, MAX_TITLE_LENGTH,
};
pub use library::{Librarian, LibrarianInput, Library, LibraryBookInput, LibraryDetail, LibraryInput};
pub use session::{Session, MAX_SESSION_LIFETIME_DAYS};
pub use user::{CreateUserInput, Permission, User, UserProfile, UserRole};
