//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! - Traits define the persistence gateway the service layer talks to
//! - SQLite implementations use sqlx for async database access
//! - Every operation is scoped to one user
//!
//! ## Available Repositories
//!
//! - `ProfileRepository` - User accounts
//! - `BookRepository` - Books, upserted on `(user, external book id)`
//! - `ShelfRepository` - Bookshelves and book membership

pub mod book;
pub mod profile;
pub mod shelf;

pub use book::{BookRepository, SqliteBookRepository};
pub use profile::{ProfileRepository, SqliteProfileRepository};
pub use shelf::{ShelfRepository, SqliteShelfRepository};
