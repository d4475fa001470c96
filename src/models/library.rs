//! Library and librarian models

use serde::{Deserialize, Serialize};

use super::Book;

/// Library entity. Names are unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Library {
    pub id: i64,
    pub name: String,
}

/// Librarian running a library. A library has at most one librarian.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Librarian {
    pub id: i64,
    pub name: String,
    /// Library ID, serialized as `library`
    #[serde(rename = "library")]
    pub library_id: i64,
}

/// Library with its holdings and librarian
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryDetail {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
    pub librarian: Option<Librarian>,
}

impl LibraryDetail {
    pub fn new(library: Library, books: Vec<Book>, librarian: Option<Librarian>) -> Self {
        Self {
            id: library.id,
            name: library.name,
            books,
            librarian,
        }
    }
}

/// Input for creating a library
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryInput {
    pub name: Option<String>,
}

/// Input for assigning a librarian
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibrarianInput {
    pub name: Option<String>,
}

/// Input for adding a book to a library
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryBookInput {
    pub book: Option<i64>,
}
