//! Book model
//!
//! Books belong to exactly one author and may be held by any number of
//! libraries. This module also defines the list query used by the REST API
//! (exact filters, free-text search and ordering).

use serde::{Deserialize, Serialize};

/// Maximum length of a book title
pub const MAX_TITLE_LENGTH: usize = 255;

/// Book entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    /// Unique identifier
    pub id: i64,
    /// Title (non-empty, at most 255 characters)
    pub title: String,
    /// Year of publication, never in the future
    pub publication_year: i32,
    /// Author ID, serialized as `author`
    #[serde(rename = "author")]
    pub author_id: i64,
}

/// Book joined with its author's name, used by the HTML views
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BookWithAuthor {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    pub author_id: i64,
    pub author_name: String,
}

/// Input for creating or updating a book.
///
/// All fields are optional: PUT and create require every field, PATCH
/// applies only the fields that are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInput {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author: Option<i64>,
}

impl BookInput {
    pub fn new(title: impl Into<String>, publication_year: i32, author: i64) -> Self {
        Self {
            title: Some(title.into()),
            publication_year: Some(publication_year),
            author: Some(author),
        }
    }
}

/// Sortable book fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOrderField {
    Title,
    PublicationYear,
}

impl BookOrderField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Title => "b.title",
            Self::PublicationYear => "b.publication_year",
        }
    }
}

/// One `ordering` term, e.g. `-publication_year`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookOrdering {
    pub field: BookOrderField,
    pub descending: bool,
}

impl BookOrdering {
    /// Parse a comma-separated ordering parameter.
    ///
    /// Unknown fields are ignored, so `"-title,bogus"` yields one term.
    pub fn parse_list(value: &str) -> Vec<BookOrdering> {
        value
            .split(',')
            .map(str::trim)
            .filter_map(|term| {
                let (descending, name) = match term.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, term),
                };
                let field = match name {
                    "title" => BookOrderField::Title,
                    "publication_year" => BookOrderField::PublicationYear,
                    _ => return None,
                };
                Some(BookOrdering { field, descending })
            })
            .collect()
    }
}

/// Filters applied to the book list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Exact title match
    pub title: Option<String>,
    /// Exact author ID match
    pub author: Option<i64>,
    /// Exact publication year match
    pub publication_year: Option<i32>,
    /// Search terms; every term must match the title or the author name
    pub search_terms: Vec<String>,
    /// Ordering terms; empty means order by ID
    pub ordering: Vec<BookOrdering>,
}

impl BookQuery {
    /// Split a `search` parameter into terms on whitespace and commas
    pub fn split_search(value: &str) -> Vec<String> {
        value
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_book_serializes_author_as_id() {
        let book = Book {
            id: 3,
            title: "Dune".to_string(),
            publication_year: 1965,
            author_id: 7,
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 3, "title": "Dune", "publication_year": 1965, "author": 7})
        );
    }

    #[test]
    fn test_parse_ordering() {
        let ordering = BookOrdering::parse_list("-publication_year,title");
        assert_eq!(
            ordering,
            vec![
                BookOrdering {
                    field: BookOrderField::PublicationYear,
                    descending: true
                },
                BookOrdering {
                    field: BookOrderField::Title,
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn test_parse_ordering_ignores_unknown_fields() {
        assert!(BookOrdering::parse_list("author,-id,").is_empty());
        assert_eq!(BookOrdering::parse_list("bogus, -title").len(), 1);
    }

    #[test]
    fn test_split_search() {
        assert_eq!(
            BookQuery::split_search("dune  herbert,1965"),
            vec!["dune", "herbert", "1965"]
        );
        assert!(BookQuery::split_search(" , ").is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_search_terms_have_no_separators(input in "[a-z ,]{0,40}") {
            for term in BookQuery::split_search(&input) {
                prop_assert!(!term.is_empty());
                prop_assert!(!term.contains(' '));
                prop_assert!(!term.contains(','));
            }
        }
    }
}
