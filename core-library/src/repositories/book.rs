//! Book repository trait and implementation
//!
//! Every query is scoped to one user. Listings are ordered by read date,
//! newest first.

use crate::error::{LibraryError, Result};
use crate::models::Book;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Book repository interface for data access operations
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert or update books keyed on `(user_id, external_book_id)`.
    ///
    /// Returns the stored rows in input order. A book that already existed
    /// keeps its original `id` and `created_at`.
    async fn upsert_many(&self, books: &[Book]) -> Result<Vec<Book>>;

    /// Insert a single new book
    ///
    /// # Errors
    /// `InvalidInput` on validation failure, `Database` on a duplicate key.
    async fn insert(&self, book: &Book) -> Result<()>;

    async fn find_by_id(&self, user_id: &str, book_id: &str) -> Result<Option<Book>>;

    /// All of a user's books
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Book>>;

    /// Books rated 5
    async fn list_five_star(&self, user_id: &str) -> Result<Vec<Book>>;

    async fn list_by_year(&self, user_id: &str, year: i32) -> Result<Vec<Book>>;

    /// Books on the named shelf
    async fn list_by_shelf(&self, user_id: &str, shelf_name: &str) -> Result<Vec<Book>>;

    /// Replace a book's cover and ISBN
    ///
    /// # Returns
    /// - `Ok(true)` if the book was updated
    /// - `Ok(false)` if no such book exists for the user
    async fn update_cover(
        &self,
        user_id: &str,
        book_id: &str,
        cover_url: &str,
        isbn: &str,
    ) -> Result<bool>;

    /// Delete a book and its shelf memberships
    ///
    /// # Returns
    /// `Ok(false)` if the book was not found
    async fn delete(&self, user_id: &str, book_id: &str) -> Result<bool>;
}

/// SQLite implementation of BookRepository
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn invalid(message: String) -> LibraryError {
    LibraryError::InvalidInput {
        field: "Book".to_string(),
        message,
    }
}

const UPSERT_BOOK: &str = r#"
    INSERT INTO books (
        id, user_id, external_book_id, title, author, author_last_first,
        additional_authors, isbn, isbn13, cover_image_url, number_of_pages,
        publisher, binding, year_published, original_publication_year,
        my_rating, average_rating, date_read, date_added, year_read,
        exclusive_shelf, my_review, spoiler, private_notes, read_count,
        owned_copies, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (user_id, external_book_id) DO UPDATE SET
        title = excluded.title,
        author = excluded.author,
        author_last_first = excluded.author_last_first,
        additional_authors = excluded.additional_authors,
        isbn = excluded.isbn,
        isbn13 = excluded.isbn13,
        cover_image_url = excluded.cover_image_url,
        number_of_pages = excluded.number_of_pages,
        publisher = excluded.publisher,
        binding = excluded.binding,
        year_published = excluded.year_published,
        original_publication_year = excluded.original_publication_year,
        my_rating = excluded.my_rating,
        average_rating = excluded.average_rating,
        date_read = excluded.date_read,
        date_added = excluded.date_added,
        year_read = excluded.year_read,
        exclusive_shelf = excluded.exclusive_shelf,
        my_review = excluded.my_review,
        spoiler = excluded.spoiler,
        private_notes = excluded.private_notes,
        read_count = excluded.read_count,
        owned_copies = excluded.owned_copies,
        updated_at = excluded.updated_at
    RETURNING *
"#;

const INSERT_BOOK: &str = r#"
    INSERT INTO books (
        id, user_id, external_book_id, title, author, author_last_first,
        additional_authors, isbn, isbn13, cover_image_url, number_of_pages,
        publisher, binding, year_published, original_publication_year,
        my_rating, average_rating, date_read, date_added, year_read,
        exclusive_shelf, my_review, spoiler, private_notes, read_count,
        owned_copies, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

macro_rules! bind_book {
    ($query:expr, $book:expr) => {
        $query
            .bind(&$book.id)
            .bind(&$book.user_id)
            .bind(&$book.external_book_id)
            .bind(&$book.title)
            .bind(&$book.author)
            .bind(&$book.author_last_first)
            .bind(&$book.additional_authors)
            .bind(&$book.isbn)
            .bind(&$book.isbn13)
            .bind(&$book.cover_image_url)
            .bind($book.number_of_pages)
            .bind(&$book.publisher)
            .bind(&$book.binding)
            .bind($book.year_published)
            .bind($book.original_publication_year)
            .bind($book.my_rating)
            .bind($book.average_rating)
            .bind(&$book.date_read)
            .bind(&$book.date_added)
            .bind($book.year_read)
            .bind(&$book.exclusive_shelf)
            .bind(&$book.my_review)
            .bind(&$book.spoiler)
            .bind(&$book.private_notes)
            .bind($book.read_count)
            .bind($book.owned_copies)
            .bind($book.created_at)
            .bind($book.updated_at)
    };
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn upsert_many(&self, books: &[Book]) -> Result<Vec<Book>> {
        let mut saved = Vec::with_capacity(books.len());

        for book in books {
            book.validate().map_err(invalid)?;

            let row = bind_book!(query_as::<_, Book>(UPSERT_BOOK), book)
                .fetch_one(&self.pool)
                .await?;
            saved.push(row);
        }

        Ok(saved)
    }

    async fn insert(&self, book: &Book) -> Result<()> {
        book.validate().map_err(invalid)?;

        bind_book!(query(INSERT_BOOK), book)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: &str, book_id: &str) -> Result<Option<Book>> {
        let book = query_as::<_, Book>("SELECT * FROM books WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Book>> {
        let books = query_as::<_, Book>(
            "SELECT * FROM books WHERE user_id = ? ORDER BY date_read DESC, title ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn list_five_star(&self, user_id: &str) -> Result<Vec<Book>> {
        let books = query_as::<_, Book>(
            "SELECT * FROM books WHERE user_id = ? AND my_rating = 5 ORDER BY date_read DESC, title ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn list_by_year(&self, user_id: &str, year: i32) -> Result<Vec<Book>> {
        let books = query_as::<_, Book>(
            "SELECT * FROM books WHERE user_id = ? AND year_read = ? ORDER BY date_read DESC, title ASC",
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn list_by_shelf(&self, user_id: &str, shelf_name: &str) -> Result<Vec<Book>> {
        let books = query_as::<_, Book>(
            r#"
            SELECT b.* FROM books b
            INNER JOIN book_shelves bs ON bs.book_id = b.id
            INNER JOIN bookshelves s ON s.id = bs.bookshelf_id
            WHERE b.user_id = ? AND s.user_id = ? AND s.name = ?
            ORDER BY b.date_read DESC, b.title ASC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(shelf_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn update_cover(
        &self,
        user_id: &str,
        book_id: &str,
        cover_url: &str,
        isbn: &str,
    ) -> Result<bool> {
        let result = query(
            r#"
            UPDATE books
            SET cover_image_url = ?, isbn = ?, updated_at = ?
            WHERE user_id = ? AND id = ?
            "#,
        )
        .bind(cover_url)
        .bind(isbn)
        .bind(chrono::Utc::now().timestamp())
        .bind(user_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user_id: &str, book_id: &str) -> Result<bool> {
        query(
            "DELETE FROM book_shelves WHERE book_id IN (SELECT id FROM books WHERE user_id = ? AND id = ?)",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;

        let result = query("DELETE FROM books WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
