//! Bookshelf repository trait and implementation
//!
//! Shelves are unique per `(user_id, name)`. Membership lives in
//! `book_shelves` and is removed with either side.

use crate::error::{LibraryError, Result};
use crate::models::{Shelf, DEFAULT_SHELVES};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Bookshelf repository interface
#[async_trait]
pub trait ShelfRepository: Send + Sync {
    /// Create `read`, `currently-reading` and `to-read` if missing.
    async fn ensure_defaults(&self, user_id: &str) -> Result<()>;

    /// Create any shelves in `names` that do not exist yet and return all
    /// of them, in the order given.
    async fn upsert_many(&self, user_id: &str, names: &[String]) -> Result<Vec<Shelf>>;

    async fn find_by_name(&self, user_id: &str, name: &str) -> Result<Option<Shelf>>;

    /// Default shelves first, then by name
    async fn list(&self, user_id: &str) -> Result<Vec<Shelf>>;

    /// Link books to shelves; existing links are left alone.
    async fn add_memberships(&self, links: &[(String, String)]) -> Result<()>;

    /// Remove every book from a shelf, returning how many links were dropped.
    async fn clear(&self, shelf_id: &str) -> Result<u64>;

    /// `(book_id, shelf_name)` for every membership of the user's books
    async fn memberships(&self, user_id: &str) -> Result<Vec<(String, String)>>;
}

/// SQLite implementation of ShelfRepository
pub struct SqliteShelfRepository {
    pool: SqlitePool,
}

impl SqliteShelfRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_if_missing(&self, shelf: &Shelf) -> Result<()> {
        shelf
            .validate()
            .map_err(|e| LibraryError::InvalidInput {
                field: "Shelf".to_string(),
                message: e,
            })?;

        query(
            r#"
            INSERT INTO bookshelves (
                id, user_id, name, description, is_public, is_default, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, name) DO NOTHING
            "#,
        )
        .bind(&shelf.id)
        .bind(&shelf.user_id)
        .bind(&shelf.name)
        .bind(&shelf.description)
        .bind(shelf.is_public)
        .bind(shelf.is_default)
        .bind(shelf.created_at)
        .bind(shelf.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ShelfRepository for SqliteShelfRepository {
    async fn ensure_defaults(&self, user_id: &str) -> Result<()> {
        for name in DEFAULT_SHELVES {
            self.insert_if_missing(&Shelf::new(user_id, name)).await?;
        }
        Ok(())
    }

    async fn upsert_many(&self, user_id: &str, names: &[String]) -> Result<Vec<Shelf>> {
        let mut shelves = Vec::with_capacity(names.len());

        for name in names {
            self.insert_if_missing(&Shelf::new(user_id, name.as_str()))
                .await?;

            let shelf = self
                .find_by_name(user_id, name)
                .await?
                .ok_or_else(|| LibraryError::NotFound {
                    entity_type: "Shelf".to_string(),
                    id: name.clone(),
                })?;
            shelves.push(shelf);
        }

        Ok(shelves)
    }

    async fn find_by_name(&self, user_id: &str, name: &str) -> Result<Option<Shelf>> {
        let shelf =
            query_as::<_, Shelf>("SELECT * FROM bookshelves WHERE user_id = ? AND name = ?")
                .bind(user_id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(shelf)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Shelf>> {
        let shelves = query_as::<_, Shelf>(
            "SELECT * FROM bookshelves WHERE user_id = ? ORDER BY is_default DESC, name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shelves)
    }

    async fn add_memberships(&self, links: &[(String, String)]) -> Result<()> {
        let added_at = chrono::Utc::now().timestamp();

        for (book_id, shelf_id) in links {
            query(
                r#"
                INSERT INTO book_shelves (book_id, bookshelf_id, added_at)
                VALUES (?, ?, ?)
                ON CONFLICT (book_id, bookshelf_id) DO NOTHING
                "#,
            )
            .bind(book_id)
            .bind(shelf_id)
            .bind(added_at)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn clear(&self, shelf_id: &str) -> Result<u64> {
        let result = query("DELETE FROM book_shelves WHERE bookshelf_id = ?")
            .bind(shelf_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn memberships(&self, user_id: &str) -> Result<Vec<(String, String)>> {
        let rows = query_as::<_, (String, String)>(
            r#"
            SELECT bs.book_id, s.name FROM book_shelves bs
            INNER JOIN bookshelves s ON s.id = bs.bookshelf_id
            WHERE s.user_id = ?
            ORDER BY s.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
