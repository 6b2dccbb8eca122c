//! Domain models for the reading library.
//!
//! Records flow through three shapes: [`RawBookRecord`] as parsed from a
//! library export, [`EnrichedBookRecord`] once a cover lookup has run, and
//! [`Book`] as persisted for one user.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Shelf names that exist for every user.
pub const DEFAULT_SHELVES: [&str; 3] = ["read", "currently-reading", "to-read"];

/// Returns true for the three built-in shelves.
pub fn is_default_shelf(name: &str) -> bool {
    DEFAULT_SHELVES.contains(&name)
}

// =============================================================================
// Exclusive shelf
// =============================================================================

/// The single primary status of a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExclusiveShelf {
    Read,
    CurrentlyReading,
    #[default]
    ToRead,
    /// Anything else found in an export. Such rows are filtered, not rejected.
    Other(String),
}

impl ExclusiveShelf {
    pub fn as_str(&self) -> &str {
        match self {
            ExclusiveShelf::Read => "read",
            ExclusiveShelf::CurrentlyReading => "currently-reading",
            ExclusiveShelf::ToRead => "to-read",
            ExclusiveShelf::Other(name) => name,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "read" => ExclusiveShelf::Read,
            "currently-reading" => ExclusiveShelf::CurrentlyReading,
            "to-read" => ExclusiveShelf::ToRead,
            other => ExclusiveShelf::Other(other.to_string()),
        }
    }
}

impl From<String> for ExclusiveShelf {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ExclusiveShelf> for String {
    fn from(shelf: ExclusiveShelf) -> Self {
        shelf.as_str().to_string()
    }
}

impl fmt::Display for ExclusiveShelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Records
// =============================================================================

/// One row of a library export after cleaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawBookRecord {
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub author_last_first: String,
    pub additional_authors: String,
    pub isbn: String,
    pub isbn13: String,
    pub my_rating: i32,
    pub average_rating: f64,
    pub publisher: String,
    pub binding: String,
    pub number_of_pages: i32,
    pub year_published: i32,
    pub original_publication_year: i32,
    pub date_read: String,
    pub date_added: String,
    pub bookshelves: Vec<String>,
    pub bookshelves_with_positions: String,
    pub exclusive_shelf: ExclusiveShelf,
    pub my_review: String,
    pub spoiler: String,
    pub private_notes: String,
    pub read_count: i32,
    pub owned_copies: i32,
}

impl RawBookRecord {
    /// Only finished books with a read date are kept from an import.
    pub fn is_completed_read(&self) -> bool {
        self.exclusive_shelf == ExclusiveShelf::Read && !self.date_read.trim().is_empty()
    }

    pub fn isbn13(&self) -> Option<&str> {
        non_empty(&self.isbn13)
    }

    pub fn isbn10(&self) -> Option<&str> {
        non_empty(&self.isbn)
    }
}

/// A record ready for display and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBookRecord {
    #[serde(flatten)]
    pub record: RawBookRecord,
    pub cover_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Provider that supplied the cover, e.g. `Google-ISBN13`.
    pub cover_source: Option<String>,
    pub year_read: Option<i32>,
    pub spine_width: f64,
}

impl EnrichedBookRecord {
    /// Derives the display fields; no cover attached yet.
    pub fn from_raw(record: RawBookRecord) -> Self {
        let year_read = year_from_date(&record.date_read);
        let spine_width = spine_width(record.number_of_pages);
        Self {
            record,
            cover_url: None,
            thumbnail_url: None,
            cover_source: None,
            year_read,
            spine_width,
        }
    }

    pub fn with_cover(
        mut self,
        cover_url: impl Into<String>,
        thumbnail_url: Option<String>,
        source: impl Into<String>,
    ) -> Self {
        self.cover_url = Some(cover_url.into());
        self.thumbnail_url = thumbnail_url;
        self.cover_source = Some(source.into());
        self
    }

    pub fn has_cover(&self) -> bool {
        self.cover_url.is_some()
    }
}

/// Display width for a book spine: `max(pages / 100, 20)`.
pub fn spine_width(pages: i32) -> f64 {
    (f64::from(pages) / 100.0).max(20.0)
}

/// Year component of an export date.
///
/// Accepts `YYYY/MM/DD` and `YYYY-MM-DD`; anything else falls back to a
/// leading four-digit year.
pub fn year_from_date(date: &str) -> Option<i32> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    for format in ["%Y/%m/%d", "%Y-%m-%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, format) {
            return Some(parsed.year());
        }
    }

    let prefix: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
    if prefix.len() == 4 {
        prefix.parse().ok()
    } else {
        None
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// =============================================================================
// Persisted rows
// =============================================================================

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub profile_photo_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Profile {
    pub fn new(username: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            profile_photo_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err("Username cannot be empty".to_string());
        }
        if username.chars().any(char::is_whitespace) {
            return Err("Username cannot contain whitespace".to_string());
        }
        Ok(())
    }
}

/// A book owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: String,
    pub user_id: String,
    /// Export book id, or `manual-{millis}` for hand-added books
    pub external_book_id: String,
    pub title: String,
    pub author: String,
    pub author_last_first: String,
    pub additional_authors: String,
    pub isbn: String,
    pub isbn13: String,
    pub cover_image_url: Option<String>,
    pub number_of_pages: i32,
    pub publisher: String,
    pub binding: String,
    pub year_published: i32,
    pub original_publication_year: i32,
    pub my_rating: i32,
    pub average_rating: f64,
    pub date_read: String,
    pub date_added: String,
    pub year_read: Option<i32>,
    pub exclusive_shelf: String,
    pub my_review: String,
    pub spoiler: String,
    pub private_notes: String,
    pub read_count: i32,
    pub owned_copies: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Book {
    /// Row for `user_id` built from an enriched record.
    pub fn from_record(user_id: impl Into<String>, enriched: &EnrichedBookRecord) -> Self {
        let now = chrono::Utc::now().timestamp();
        let r = &enriched.record;
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            external_book_id: r.book_id.clone(),
            title: r.title.clone(),
            author: r.author.clone(),
            author_last_first: r.author_last_first.clone(),
            additional_authors: r.additional_authors.clone(),
            isbn: r.isbn.clone(),
            isbn13: r.isbn13.clone(),
            cover_image_url: enriched.cover_url.clone(),
            number_of_pages: r.number_of_pages,
            publisher: r.publisher.clone(),
            binding: r.binding.clone(),
            year_published: r.year_published,
            original_publication_year: r.original_publication_year,
            my_rating: r.my_rating,
            average_rating: r.average_rating,
            date_read: r.date_read.clone(),
            date_added: r.date_added.clone(),
            year_read: enriched.year_read,
            exclusive_shelf: r.exclusive_shelf.as_str().to_string(),
            my_review: r.my_review.clone(),
            spoiler: r.spoiler.clone(),
            private_notes: r.private_notes.clone(),
            read_count: r.read_count,
            owned_copies: r.owned_copies,
            created_at: now,
            updated_at: now,
        }
    }

    /// Back to the display shape. Shelf membership is stored separately,
    /// so the caller supplies it.
    pub fn to_record(&self, bookshelves: Vec<String>) -> EnrichedBookRecord {
        let record = RawBookRecord {
            book_id: self.external_book_id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            author_last_first: self.author_last_first.clone(),
            additional_authors: self.additional_authors.clone(),
            isbn: self.isbn.clone(),
            isbn13: self.isbn13.clone(),
            my_rating: self.my_rating,
            average_rating: self.average_rating,
            publisher: self.publisher.clone(),
            binding: self.binding.clone(),
            number_of_pages: self.number_of_pages,
            year_published: self.year_published,
            original_publication_year: self.original_publication_year,
            date_read: self.date_read.clone(),
            date_added: self.date_added.clone(),
            bookshelves,
            bookshelves_with_positions: String::new(),
            exclusive_shelf: ExclusiveShelf::parse(&self.exclusive_shelf),
            my_review: self.my_review.clone(),
            spoiler: self.spoiler.clone(),
            private_notes: self.private_notes.clone(),
            read_count: self.read_count,
            owned_copies: self.owned_copies,
        };

        EnrichedBookRecord {
            record,
            cover_url: self.cover_image_url.clone(),
            thumbnail_url: None,
            cover_source: None,
            year_read: self.year_read,
            spine_width: spine_width(self.number_of_pages),
        }
    }

    pub fn spine_width(&self) -> f64 {
        spine_width(self.number_of_pages)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Book title cannot be empty".to_string());
        }
        if self.external_book_id.trim().is_empty() {
            return Err("External book id cannot be empty".to_string());
        }
        if !(0..=5).contains(&self.my_rating) {
            return Err(format!("Rating {} is outside 0-5", self.my_rating));
        }
        Ok(())
    }
}

/// Named grouping of books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Shelf {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub is_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Shelf {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            is_default: is_default_shelf(&name),
            name,
            description: None,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Shelf name cannot be empty".to_string());
        }
        Ok(())
    }
}
