//! The library façade: imports, manual edits, views and comparisons for
//! one signed-in user at a time.

use crate::error::{Result, ServiceError};
use crate::session::Session;
use bridge_traits::time::{Clock, SystemClock};
use core_library::comparison::{comparison_shelf_name, derive_shelf_plan, shared_books, SharedBook};
use core_library::ingest::{parse_library_export, parse_library_export_path};
use core_library::models::{Book, EnrichedBookRecord, ExclusiveShelf, Profile, RawBookRecord, Shelf};
use core_library::repositories::{
    BookRepository, ProfileRepository, ShelfRepository, SqliteBookRepository,
    SqliteProfileRepository, SqliteShelfRepository,
};
use core_library::LibraryError;
use core_metadata::{CoverLookup, EnrichmentPipeline, IsbnCoverPreview};
use core_runtime::config::EnrichmentSettings;
use core_runtime::events::{CoreEvent, EventBus, ImportEvent, LibraryEvent};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Finished books found in the export
    pub parsed: usize,
    /// Rows inserted or updated
    pub imported: usize,
    pub covers_found: usize,
    /// Shelves the import touched, exclusive shelves included
    pub shelves: Vec<String>,
}

/// Fields for a hand-entered book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub pages: Option<i32>,
}

/// Books two users share, materialized as a shelf of the requesting user.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub shelf_name: String,
    pub books: Vec<SharedBook>,
}

pub struct LibraryService {
    profiles: Arc<dyn ProfileRepository>,
    books: Arc<dyn BookRepository>,
    shelves: Arc<dyn ShelfRepository>,
    pipeline: EnrichmentPipeline,
    preview: Arc<IsbnCoverPreview>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl LibraryService {
    /// Service over the SQLite repositories of `pool`.
    pub fn new(
        pool: SqlitePool,
        lookup: Arc<dyn CoverLookup>,
        preview: Arc<IsbnCoverPreview>,
        settings: EnrichmentSettings,
    ) -> Self {
        let events = EventBus::default();
        Self {
            profiles: Arc::new(SqliteProfileRepository::new(pool.clone())),
            books: Arc::new(SqliteBookRepository::new(pool.clone())),
            shelves: Arc::new(SqliteShelfRepository::new(pool)),
            pipeline: EnrichmentPipeline::new(lookup, settings).with_event_bus(events.clone()),
            preview,
            events,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bus carrying import progress and library changes.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Registers a user with the three default shelves.
    #[instrument(skip(self))]
    pub async fn create_user(&self, username: &str) -> Result<Session> {
        let profile = Profile::new(username.trim());
        self.profiles.insert(&profile).await?;
        self.shelves.ensure_defaults(&profile.id).await?;
        info!(user_id = %profile.id, "Created user");
        Ok(Session::from(&profile))
    }

    pub async fn session_for(&self, username: &str) -> Result<Session> {
        self.profiles
            .find_by_username(username.trim())
            .await?
            .map(|profile| Session::from(&profile))
            .ok_or_else(|| ServiceError::UserNotFound(username.to_string()))
    }

    // ------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------

    /// Imports an export file for the session user.
    #[instrument(skip(self, session, path), fields(user = %session.username, path = %path.as_ref().display()))]
    pub async fn import_export_path(
        &self,
        session: &Session,
        path: impl AsRef<Path>,
    ) -> Result<ImportSummary> {
        let records = parse_library_export_path(path)?;
        self.import_records(session, records).await
    }

    /// Imports an export read from any source.
    #[instrument(skip(self, session, reader), fields(user = %session.username))]
    pub async fn import_export<R: Read>(&self, session: &Session, reader: R) -> Result<ImportSummary> {
        let records = parse_library_export(reader)?;
        self.import_records(session, records).await
    }

    async fn import_records(
        &self,
        session: &Session,
        records: Vec<RawBookRecord>,
    ) -> Result<ImportSummary> {
        let parsed = records.len();
        self.events
            .emit(CoreEvent::Import(ImportEvent::Started { total: parsed }));

        let enriched = self.pipeline.enrich(records).await;
        let covers_found = enriched.iter().filter(|e| e.has_cover()).count();

        let rows: Vec<Book> = enriched
            .iter()
            .map(|record| Book::from_record(&session.user_id, record))
            .collect();
        let stored = self.books.upsert_many(&rows).await?;

        self.shelves.ensure_defaults(&session.user_id).await?;
        let plan = derive_shelf_plan(enriched.iter().map(|e| &e.record));
        let shelves = self
            .shelves
            .upsert_many(&session.user_id, &plan.shelves)
            .await?;

        let shelf_ids: HashMap<&str, &str> = shelves
            .iter()
            .map(|s| (s.name.as_str(), s.id.as_str()))
            .collect();
        let book_ids: HashMap<&str, &str> = stored
            .iter()
            .map(|b| (b.external_book_id.as_str(), b.id.as_str()))
            .collect();

        let links: Vec<(String, String)> = plan
            .memberships
            .iter()
            .filter_map(|(external_id, shelf)| {
                let book_id = book_ids.get(external_id.as_str())?;
                let shelf_id = shelf_ids.get(shelf.as_str())?;
                Some((book_id.to_string(), shelf_id.to_string()))
            })
            .collect();
        self.shelves.add_memberships(&links).await?;

        info!(
            parsed,
            imported = stored.len(),
            covers_found,
            shelves = plan.shelves.len(),
            "Import finished"
        );
        self.events.emit(CoreEvent::Import(ImportEvent::Completed {
            imported: stored.len(),
            covers_found,
        }));

        Ok(ImportSummary {
            parsed,
            imported: stored.len(),
            covers_found,
            shelves: plan.shelves,
        })
    }

    // ------------------------------------------------------------------
    // Manual edits
    // ------------------------------------------------------------------

    /// Adds a book to the `to-read` shelf, with a cover from the ISBN when
    /// one is given and found.
    #[instrument(skip(self, session, book), fields(user = %session.username, title = %book.title))]
    pub async fn add_book(&self, session: &Session, book: NewBook) -> Result<Book> {
        let title = book.title.trim();
        let author = book.author.trim();
        if title.is_empty() {
            return Err(ServiceError::validation("title", "is required"));
        }
        if author.is_empty() {
            return Err(ServiceError::validation("author", "is required"));
        }
        let pages = book.pages.unwrap_or(0);
        if pages < 0 {
            return Err(ServiceError::validation("pages", "cannot be negative"));
        }

        let isbn = book
            .isbn
            .as_deref()
            .map(str::trim)
            .filter(|isbn| !isbn.is_empty())
            .map(String::from);

        let cover = match &isbn {
            Some(isbn) => self.preview.lookup(isbn).await,
            None => None,
        };

        let record = RawBookRecord {
            book_id: format!("manual-{}", self.clock.unix_timestamp_millis()),
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.unwrap_or_default(),
            number_of_pages: pages,
            date_added: self.clock.today().format("%Y-%m-%d").to_string(),
            exclusive_shelf: ExclusiveShelf::ToRead,
            ..Default::default()
        };
        let mut enriched = EnrichedBookRecord::from_raw(record);
        enriched.cover_url = cover;

        let row = Book::from_record(&session.user_id, &enriched);
        self.books.insert(&row).await?;

        self.shelves.ensure_defaults(&session.user_id).await?;
        if let Some(shelf) = self
            .shelves
            .find_by_name(&session.user_id, ExclusiveShelf::ToRead.as_str())
            .await?
        {
            self.shelves
                .add_memberships(&[(row.id.clone(), shelf.id)])
                .await?;
        }

        self.events.emit(CoreEvent::Library(LibraryEvent::BookAdded {
            book_id: row.id.clone(),
            title: row.title.clone(),
            author: row.author.clone(),
        }));
        Ok(row)
    }

    /// Looks up a cover for `isbn` without changing anything.
    pub async fn preview_cover(&self, isbn: &str) -> Option<String> {
        self.preview.lookup(isbn).await
    }

    /// Replaces a book's cover with the one found for `isbn`, storing the
    /// ISBN as well.
    #[instrument(skip(self, session), fields(user = %session.username))]
    pub async fn change_cover(&self, session: &Session, book_id: &str, isbn: &str) -> Result<String> {
        let isbn = isbn.trim();
        if isbn.is_empty() {
            return Err(ServiceError::validation("isbn", "is required"));
        }
        if self.books.find_by_id(&session.user_id, book_id).await?.is_none() {
            return Err(book_not_found(book_id));
        }

        let cover_url = self
            .preview
            .lookup(isbn)
            .await
            .ok_or_else(|| ServiceError::CoverNotFound(isbn.to_string()))?;

        if !self
            .books
            .update_cover(&session.user_id, book_id, &cover_url, isbn)
            .await?
        {
            return Err(book_not_found(book_id));
        }

        self.events
            .emit(CoreEvent::Library(LibraryEvent::CoverChanged {
                book_id: book_id.to_string(),
                cover_url: cover_url.clone(),
            }));
        Ok(cover_url)
    }

    #[instrument(skip(self, session), fields(user = %session.username))]
    pub async fn delete_book(&self, session: &Session, book_id: &str) -> Result<()> {
        if !self.books.delete(&session.user_id, book_id).await? {
            return Err(book_not_found(book_id));
        }
        warn!(book_id, "Book deleted");
        self.events
            .emit(CoreEvent::Library(LibraryEvent::BookDeleted {
                book_id: book_id.to_string(),
            }));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Every book with its custom shelves attached, newest read first.
    ///
    /// The book's own exclusive shelf is left out of `bookshelves` so that
    /// shelf filters and shelf lists only see custom shelves.
    pub async fn library(&self, session: &Session) -> Result<Vec<EnrichedBookRecord>> {
        let books = self.books.list_by_user(&session.user_id).await?;
        let mut shelves_by_book: HashMap<String, Vec<String>> = HashMap::new();
        for (book_id, shelf) in self.shelves.memberships(&session.user_id).await? {
            shelves_by_book.entry(book_id).or_default().push(shelf);
        }

        Ok(books
            .iter()
            .map(|book| {
                let shelves = shelves_by_book
                    .remove(&book.id)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|shelf| *shelf != book.exclusive_shelf)
                    .collect();
                book.to_record(shelves)
            })
            .collect())
    }

    /// Every book as stored, newest read first.
    pub async fn books(&self, session: &Session) -> Result<Vec<Book>> {
        Ok(self.books.list_by_user(&session.user_id).await?)
    }

    pub async fn five_star_books(&self, session: &Session) -> Result<Vec<Book>> {
        Ok(self.books.list_five_star(&session.user_id).await?)
    }

    pub async fn books_read_in(&self, session: &Session, year: i32) -> Result<Vec<Book>> {
        Ok(self.books.list_by_year(&session.user_id, year).await?)
    }

    pub async fn books_on_shelf(&self, session: &Session, shelf: &str) -> Result<Vec<Book>> {
        Ok(self.books.list_by_shelf(&session.user_id, shelf).await?)
    }

    /// Default shelves first, then by name.
    pub async fn shelves(&self, session: &Session) -> Result<Vec<Shelf>> {
        Ok(self.shelves.list(&session.user_id).await?)
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    /// Finds the books shared with `their_username` and stores them on the
    /// shelf `"{me} × {them}"`, replacing what it held before.
    ///
    /// The shelf is cleared and refilled in separate statements; a failure
    /// in between leaves it partially filled until the next comparison.
    #[instrument(skip(self, session), fields(user = %session.username))]
    pub async fn compare_with(&self, session: &Session, their_username: &str) -> Result<Comparison> {
        let them = self.session_for(their_username).await?;

        let mine = self.books.list_by_user(&session.user_id).await?;
        let theirs = self.books.list_by_user(&them.user_id).await?;
        let shared = shared_books(&mine, &theirs);

        let shelf_name = comparison_shelf_name(&session.username, &them.username);
        let shelf = self
            .shelves
            .upsert_many(&session.user_id, std::slice::from_ref(&shelf_name))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Shelf".to_string(),
                id: shelf_name.clone(),
            })?;

        self.shelves.clear(&shelf.id).await?;
        let links: Vec<(String, String)> = shared
            .iter()
            .map(|s| (s.book.id.clone(), shelf.id.clone()))
            .collect();
        self.shelves.add_memberships(&links).await?;

        info!(shared = shared.len(), shelf = %shelf_name, "Comparison shelf rebuilt");
        self.events
            .emit(CoreEvent::Library(LibraryEvent::ShelfUpdated {
                shelf_name: shelf_name.clone(),
                book_count: shared.len(),
            }));

        Ok(Comparison {
            shelf_name,
            books: shared,
        })
    }
}

fn book_not_found(book_id: &str) -> ServiceError {
    ServiceError::Library(LibraryError::NotFound {
        entity_type: "Book".to_string(),
        id: book_id.to_string(),
    })
}
