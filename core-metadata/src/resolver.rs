//! Cover Resolver
//!
//! Finds a cover for a book by trying an ordered chain of strategies and
//! stopping at the first hit:
//!
//! 1. Google Books by ISBN-13
//! 2. Google Books by ISBN-10
//! 3. Open Library title search (placeholder images rejected)
//! 4. Google Books title search
//!
//! Strategies report transport and decoding problems as errors; the
//! resolver logs them and moves on, so a lookup never fails. A book nothing
//! matches simply has no cover.

use crate::error::Result;
use crate::providers::{GoogleBooksClient, OpenLibraryClient};
use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use core_runtime::config::CoverApiConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// What is known about a book when looking for its cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverQuery {
    pub title: String,
    pub author: String,
    pub isbn13: Option<String>,
    pub isbn10: Option<String>,
}

impl CoverQuery {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn with_isbn13(mut self, isbn: Option<&str>) -> Self {
        self.isbn13 = non_blank(isbn);
        self
    }

    pub fn with_isbn10(mut self, isbn: Option<&str>) -> Self {
        self.isbn10 = non_blank(isbn);
        self
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Provider that produced a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverSource {
    GoogleIsbn13,
    GoogleIsbn,
    OpenLibraryTitle,
    GoogleTitle,
}

impl CoverSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverSource::GoogleIsbn13 => "Google-ISBN13",
            CoverSource::GoogleIsbn => "Google-ISBN",
            CoverSource::OpenLibraryTitle => "OpenLibrary-Title",
            CoverSource::GoogleTitle => "Google-Title",
        }
    }
}

impl fmt::Display for CoverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverLookupResult {
    pub cover_url: String,
    pub thumbnail_url: String,
    pub source: CoverSource,
}

impl CoverLookupResult {
    /// Providers return a single image; it doubles as the thumbnail.
    pub fn new(url: impl Into<String>, source: CoverSource) -> Self {
        let url = url.into();
        Self {
            thumbnail_url: url.clone(),
            cover_url: url,
            source,
        }
    }
}

/// One step of the resolver chain.
#[async_trait]
pub trait CoverStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` is a miss; errors are logged by the resolver and also
    /// count as a miss.
    async fn lookup(&self, query: &CoverQuery) -> Result<Option<CoverLookupResult>>;
}

/// Seam between the enrichment pipeline and cover resolution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoverLookup: Send + Sync {
    async fn lookup(&self, query: &CoverQuery) -> Option<CoverLookupResult>;
}

// ============================================================================
// Strategies
// ============================================================================

/// Which ISBN of the query a [`GoogleBooksIsbn`] strategy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsbnKind {
    Isbn13,
    Isbn10,
}

pub struct GoogleBooksIsbn {
    client: Arc<GoogleBooksClient>,
    kind: IsbnKind,
}

impl GoogleBooksIsbn {
    pub fn new(client: Arc<GoogleBooksClient>, kind: IsbnKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl CoverStrategy for GoogleBooksIsbn {
    fn name(&self) -> &'static str {
        match self.kind {
            IsbnKind::Isbn13 => "google-isbn13",
            IsbnKind::Isbn10 => "google-isbn10",
        }
    }

    async fn lookup(&self, query: &CoverQuery) -> Result<Option<CoverLookupResult>> {
        let (isbn, source) = match self.kind {
            IsbnKind::Isbn13 => (query.isbn13.as_deref(), CoverSource::GoogleIsbn13),
            IsbnKind::Isbn10 => (query.isbn10.as_deref(), CoverSource::GoogleIsbn),
        };
        let Some(isbn) = isbn else {
            return Ok(None);
        };

        Ok(self
            .client
            .cover_by_isbn(isbn)
            .await?
            .map(|url| CoverLookupResult::new(url, source)))
    }
}

pub struct OpenLibraryTitleSearch {
    client: Arc<OpenLibraryClient>,
    placeholder_threshold_bytes: usize,
}

impl OpenLibraryTitleSearch {
    pub fn new(client: Arc<OpenLibraryClient>, placeholder_threshold_bytes: usize) -> Self {
        Self {
            client,
            placeholder_threshold_bytes,
        }
    }
}

#[async_trait]
impl CoverStrategy for OpenLibraryTitleSearch {
    fn name(&self) -> &'static str {
        "openlibrary-title"
    }

    async fn lookup(&self, query: &CoverQuery) -> Result<Option<CoverLookupResult>> {
        Ok(self
            .client
            .cover_by_title(&query.title, &query.author, self.placeholder_threshold_bytes)
            .await?
            .map(|url| CoverLookupResult::new(url, CoverSource::OpenLibraryTitle)))
    }
}

pub struct GoogleBooksTitleSearch {
    client: Arc<GoogleBooksClient>,
}

impl GoogleBooksTitleSearch {
    pub fn new(client: Arc<GoogleBooksClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CoverStrategy for GoogleBooksTitleSearch {
    fn name(&self) -> &'static str {
        "google-title"
    }

    async fn lookup(&self, query: &CoverQuery) -> Result<Option<CoverLookupResult>> {
        Ok(self
            .client
            .cover_by_title(&query.title, &query.author)
            .await?
            .map(|url| CoverLookupResult::new(url, CoverSource::GoogleTitle)))
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Ordered chain of cover strategies.
pub struct CoverResolver {
    strategies: Vec<Box<dyn CoverStrategy>>,
}

impl CoverResolver {
    pub fn new(strategies: Vec<Box<dyn CoverStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain over Google Books and Open Library.
    pub fn with_defaults(http_client: Arc<dyn HttpClient>, config: &CoverApiConfig) -> Self {
        let timeout = config.request_timeout();
        let google = Arc::new(GoogleBooksClient::new(
            http_client.clone(),
            config.google_books_api_key.clone(),
            timeout,
        ));
        let open_library = Arc::new(OpenLibraryClient::new(http_client, timeout));

        Self::new(vec![
            Box::new(GoogleBooksIsbn::new(google.clone(), IsbnKind::Isbn13)),
            Box::new(GoogleBooksIsbn::new(google.clone(), IsbnKind::Isbn10)),
            Box::new(OpenLibraryTitleSearch::new(
                open_library,
                config.placeholder_threshold_bytes,
            )),
            Box::new(GoogleBooksTitleSearch::new(google)),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// First cover any strategy finds, or `None`.
    #[instrument(skip(self, query), fields(title = %query.title))]
    pub async fn resolve(&self, query: &CoverQuery) -> Option<CoverLookupResult> {
        for strategy in &self.strategies {
            match strategy.lookup(query).await {
                Ok(Some(result)) => {
                    debug!(strategy = strategy.name(), source = %result.source, "Cover found");
                    return Some(result);
                }
                Ok(None) => {
                    debug!(strategy = strategy.name(), "No cover");
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Cover provider failed");
                }
            }
        }
        debug!("No cover from any provider");
        None
    }
}

#[async_trait]
impl CoverLookup for CoverResolver {
    async fn lookup(&self, query: &CoverQuery) -> Option<CoverLookupResult> {
        self.resolve(query).await
    }
}
