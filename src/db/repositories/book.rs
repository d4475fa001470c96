//! Book repository
//!
//! Database operations for books, including the filtered list query that
//! backs the REST API.

use crate::db::DynDatabasePool;
use crate::models::{Book, BookQuery, BookWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

/// Book repository trait
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Create a new book
    async fn create(&self, title: &str, publication_year: i32, author_id: i64) -> Result<Book>;

    /// Get book by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Book>>;

    /// List books matching the query
    async fn list(&self, query: &BookQuery) -> Result<Vec<Book>>;

    /// List all books with their author names, ordered by ID
    async fn list_with_authors(&self) -> Result<Vec<BookWithAuthor>>;

    /// List books written by an author
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Book>>;

    /// List books held by a library
    async fn list_by_library(&self, library_id: i64) -> Result<Vec<Book>>;

    /// Update a book, returning `None` if it does not exist
    async fn update(&self, book: &Book) -> Result<Option<Book>>;

    /// Delete a book, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based book repository implementation
pub struct SqlxBookRepository {
    pool: DynDatabasePool,
}

impl SqlxBookRepository {
    /// Create a new SQLx book repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BookRepository for SqlxBookRepository {
    async fn create(&self, title: &str, publication_year: i32, author_id: i64) -> Result<Book> {
        let result = sqlx::query(
            "INSERT INTO books (title, publication_year, author_id) VALUES (?, ?, ?)",
        )
        .bind(title)
        .bind(publication_year)
        .bind(author_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create book")?;

        Ok(Book {
            id: result.last_insert_rowid(),
            title: title.to_string(),
            publication_year,
            author_id,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>> {
        let row = sqlx::query(
            "SELECT id, title, publication_year, author_id FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get book by ID")?;

        Ok(row.as_ref().map(row_to_book))
    }

    async fn list(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let mut builder = build_list_query(query);
        let rows = builder
            .build()
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list books")?;

        // SQLite only folds ASCII case, so search terms are matched here
        let terms: Vec<String> = query.search_terms.iter().map(|t| t.to_lowercase()).collect();
        Ok(rows
            .iter()
            .filter(|row| matches_search(row.get("title"), row.get("author_name"), &terms))
            .map(row_to_book)
            .collect())
    }

    async fn list_with_authors(&self) -> Result<Vec<BookWithAuthor>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.publication_year, b.author_id, a.name AS author_name
            FROM books b
            JOIN authors a ON a.id = b.author_id
            ORDER BY b.id
            "#,
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list books with authors")?;

        Ok(rows
            .iter()
            .map(|row| BookWithAuthor {
                id: row.get("id"),
                title: row.get("title"),
                publication_year: row.get("publication_year"),
                author_id: row.get("author_id"),
                author_name: row.get("author_name"),
            })
            .collect())
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            "SELECT id, title, publication_year, author_id FROM books WHERE author_id = ? ORDER BY id",
        )
        .bind(author_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list books by author")?;

        Ok(rows.iter().map(row_to_book).collect())
    }

    async fn list_by_library(&self, library_id: i64) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.publication_year, b.author_id
            FROM books b
            JOIN library_books lb ON lb.book_id = b.id
            WHERE lb.library_id = ?
            ORDER BY b.id
            "#,
        )
        .bind(library_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list books by library")?;

        Ok(rows.iter().map(row_to_book).collect())
    }

    async fn update(&self, book: &Book) -> Result<Option<Book>> {
        let result = sqlx::query(
            "UPDATE books SET title = ?, publication_year = ?, author_id = ? WHERE id = ?",
        )
        .bind(&book.title)
        .bind(book.publication_year)
        .bind(book.author_id)
        .bind(book.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update book")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(book.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete book")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Build the list query: exact filters, then ordering with the book ID as
/// the final tiebreaker. Search terms are left to [`matches_search`].
fn build_list_query(query: &BookQuery) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT b.id, b.title, b.publication_year, b.author_id, a.name AS author_name
        FROM books b
        JOIN authors a ON a.id = b.author_id
        WHERE 1 = 1
        "#,
    );

    if let Some(title) = &query.title {
        builder.push(" AND b.title = ").push_bind(title.clone());
    }
    if let Some(author) = query.author {
        builder.push(" AND b.author_id = ").push_bind(author);
    }
    if let Some(year) = query.publication_year {
        builder.push(" AND b.publication_year = ").push_bind(year);
    }

    builder.push(" ORDER BY ");
    for ordering in &query.ordering {
        builder.push(ordering.field.column());
        builder.push(if ordering.descending { " DESC, " } else { " ASC, " });
    }
    builder.push("b.id ASC");

    builder
}

/// Every lower-cased term occurs in the title or the author name
fn matches_search(title: &str, author_name: &str, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let title = title.to_lowercase();
    let author_name = author_name.to_lowercase();
    terms
        .iter()
        .all(|term| title.contains(term.as_str()) || author_name.contains(term.as_str()))
}

fn row_to_book(row: &sqlx::sqlite::SqliteRow) -> Book {
    Book {
        id: row.get("id"),
        title: row.get("title"),
        publication_year: row.get("publication_year"),
        author_id: row.get("author_id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::BookOrdering;

    struct Fixture {
        repo: SqlxBookRepository,
        herbert: i64,
        le_guin: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let herbert = sqlx::query("INSERT INTO authors (name) VALUES ('Frank Herbert')")
            .execute(pool.sqlite())
            .await
            .unwrap()
            .last_insert_rowid();
        let le_guin = sqlx::query("INSERT INTO authors (name) VALUES ('Ursula K. Le Guin')")
            .execute(pool.sqlite())
            .await
            .unwrap()
            .last_insert_rowid();

        let repo = SqlxBookRepository::new(pool);
        repo.create("Dune", 1965, herbert).await.unwrap();
        repo.create("The Dispossessed", 1974, le_guin).await.unwrap();
        repo.create("A Wizard of Earthsea", 1968, le_guin).await.unwrap();

        Fixture {
            repo,
            herbert,
            le_guin,
        }
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_defaults_to_id_order() {
        let f = setup().await;

        let books = f.repo.list(&BookQuery::default()).await.unwrap();

        assert_eq!(
            titles(&books),
            vec!["Dune", "The Dispossessed", "A Wizard of Earthsea"]
        );
    }

    #[tokio::test]
    async fn test_exact_filters() {
        let f = setup().await;

        let query = BookQuery {
            author: Some(f.le_guin),
            ..Default::default()
        };
        assert_eq!(f.repo.list(&query).await.unwrap().len(), 2);

        let query = BookQuery {
            title: Some("Dune".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&f.repo.list(&query).await.unwrap()), vec!["Dune"]);

        // Title filter is exact, not a substring match
        let query = BookQuery {
            title: Some("Dun".to_string()),
            ..Default::default()
        };
        assert!(f.repo.list(&query).await.unwrap().is_empty());

        let query = BookQuery {
            publication_year: Some(1968),
            author: Some(f.herbert),
            ..Default::default()
        };
        assert!(f.repo.list(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_title_or_author() {
        let f = setup().await;

        let query = BookQuery {
            search_terms: BookQuery::split_search("le guin"),
            ..Default::default()
        };
        assert_eq!(
            titles(&f.repo.list(&query).await.unwrap()),
            vec!["The Dispossessed", "A Wizard of Earthsea"]
        );

        let query = BookQuery {
            search_terms: BookQuery::split_search("DUNE"),
            ..Default::default()
        };
        assert_eq!(titles(&f.repo.list(&query).await.unwrap()), vec!["Dune"]);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let f = setup().await;
        let zola = sqlx::query("INSERT INTO authors (name) VALUES ('Émile Zola')")
            .execute(f.repo.pool.sqlite())
            .await
            .unwrap()
            .last_insert_rowid();
        f.repo.create("Germinal", 1885, zola).await.unwrap();
        f.repo.create("ÆTHER ÖVER ÅLAND", 2001, f.herbert).await.unwrap();

        let query = BookQuery {
            search_terms: BookQuery::split_search("émile"),
            ..Default::default()
        };
        assert_eq!(titles(&f.repo.list(&query).await.unwrap()), vec!["Germinal"]);

        let query = BookQuery {
            search_terms: BookQuery::split_search("æther över"),
            ..Default::default()
        };
        assert_eq!(
            titles(&f.repo.list(&query).await.unwrap()),
            vec!["ÆTHER ÖVER ÅLAND"]
        );
    }

    #[tokio::test]
    async fn test_search_terms_are_anded() {
        let f = setup().await;

        let query = BookQuery {
            search_terms: BookQuery::split_search("guin,wizard"),
            ..Default::default()
        };
        assert_eq!(
            titles(&f.repo.list(&query).await.unwrap()),
            vec!["A Wizard of Earthsea"]
        );
    }

    #[tokio::test]
    async fn test_search_escapes_wildcards() {
        let f = setup().await;

        let query = BookQuery {
            search_terms: vec!["%".to_string()],
            ..Default::default()
        };
        assert!(f.repo.list(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ordering() {
        let f = setup().await;

        let query = BookQuery {
            ordering: BookOrdering::parse_list("-publication_year"),
            ..Default::default()
        };
        assert_eq!(
            titles(&f.repo.list(&query).await.unwrap()),
            vec!["The Dispossessed", "A Wizard of Earthsea", "Dune"]
        );

        let query = BookQuery {
            ordering: BookOrdering::parse_list("title"),
            ..Default::default()
        };
        assert_eq!(
            titles(&f.repo.list(&query).await.unwrap()),
            vec!["A Wizard of Earthsea", "Dune", "The Dispossessed"]
        );
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let f = setup().await;
        let mut book = f.repo.get_by_id(1).await.unwrap().unwrap();
        book.title = "Dune Messiah".to_string();
        book.publication_year = 1969;

        let updated = f.repo.update(&book).await.unwrap().unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(f.repo.get_by_id(1).await.unwrap().unwrap().publication_year, 1969);

        assert!(f.repo.delete(1).await.unwrap());
        assert!(f.repo.get_by_id(1).await.unwrap().is_none());
        assert!(!f.repo.delete(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_with_authors() {
        let f = setup().await;

        let books = f.repo.list_with_authors().await.unwrap();

        assert_eq!(books[0].author_name, "Frank Herbert");
        assert_eq!(books[1].author_name, "Ursula K. Le Guin");
        assert_eq!(f.repo.list_by_author(f.herbert).await.unwrap().len(), 1);
    }
}
