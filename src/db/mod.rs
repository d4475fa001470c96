//! Database layer
//!
//! SQLite persistence for the catalog. The pool is wrapped in the
//! `DatabasePool` trait, schema comes from embedded migrations, and each
//! aggregate has a repository trait with an SQLx implementation.
//!
//! # Usage
//!
//! ```ignore
//! use bookshelf::config::DatabaseConfig;
//! use bookshelf::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
