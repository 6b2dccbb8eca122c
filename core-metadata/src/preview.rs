//! ISBN cover preview.
//!
//! Used when a person types an ISBN to add a book or replace a cover. Tries,
//! in order: the Open Library books API, the Open Library covers CDN, the
//! largest Google Books image and Amazon. Unlike the import resolver, this
//! cascade favours the biggest image over a title match.

use crate::providers::{AmazonCovers, GoogleBooksClient, OpenLibraryClient};
use bridge_traits::http::HttpClient;
use core_runtime::config::CoverApiConfig;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Keeps digits and `X` (any case, normalized to upper) from a typed ISBN.
pub fn clean_preview_isbn(isbn: &str) -> String {
    isbn.trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'x'))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub struct IsbnCoverPreview {
    open_library: OpenLibraryClient,
    google_books: GoogleBooksClient,
    amazon: AmazonCovers,
    min_image_bytes: usize,
}

impl IsbnCoverPreview {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &CoverApiConfig) -> Self {
        let timeout = config.request_timeout();
        Self {
            open_library: OpenLibraryClient::new(http_client.clone(), timeout),
            google_books: GoogleBooksClient::new(
                http_client.clone(),
                config.google_books_api_key.clone(),
                timeout,
            ),
            amazon: AmazonCovers::new(http_client, timeout),
            min_image_bytes: config.preview_min_bytes,
        }
    }

    /// Best cover URL for an ISBN, or `None` when no provider has one.
    #[instrument(skip(self))]
    pub async fn lookup(&self, isbn: &str) -> Option<String> {
        let isbn = clean_preview_isbn(isbn);
        if isbn.is_empty() {
            return None;
        }

        match self.open_library.data_cover_by_isbn(&isbn).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => debug!("Open Library data API has no cover"),
            Err(e) => warn!(error = %e, "Open Library data API failed"),
        }

        if let Some(url) = self
            .open_library
            .direct_cover_by_isbn(&isbn, self.min_image_bytes)
            .await
        {
            return Some(url);
        }

        match self.google_books.preview_by_isbn(&isbn).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => debug!("Google Books has no image"),
            Err(e) => warn!(error = %e, "Google Books lookup failed"),
        }

        let amazon = self.amazon.cover_by_isbn(&isbn, self.min_image_bytes).await;
        if amazon.is_none() {
            debug!("No preview cover from any provider");
        }
        amazon
    }
}
