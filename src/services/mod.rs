//! Services layer - Business logic
//!
//! Services enforce the catalog's rules on top of the repositories:
//! - Input validation with per-field error messages
//! - Uniqueness and referential checks
//! - Authentication, sessions and roles

pub mod catalog;
pub mod library;
pub mod password;
pub mod user;
pub mod validation;

pub use catalog::{CatalogService, CatalogServiceError};
pub use library::{LibraryService, LibraryServiceError};
pub use password::{hash_password, verify_password};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
pub use validation::FieldErrors;
