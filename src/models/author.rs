//! Author model

use serde::{Deserialize, Serialize};

use super::Book;

/// Author entity. Names are unique across the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
}

/// Author together with the books they wrote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorWithBooks {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
}

impl AuthorWithBooks {
    pub fn new(author: Author, books: Vec<Book>) -> Self {
        Self {
            id: author.id,
            name: author.name,
            books,
        }
    }
}

/// Input for creating or updating an author.
///
/// Fields are optional so that missing values can be reported as validation
/// errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorInput {
    pub name: Option<String>,
}

impl AuthorInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}
