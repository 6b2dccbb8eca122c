//! Open Library Client
//!
//! ## API Endpoints
//!
//! - **Search**: `https://openlibrary.org/search.json?title={title}&author={author}&limit=5`
//! - **Books data**: `https://openlibrary.org/api/books?bibkeys=ISBN:{isbn}&format=json&jscmd=data`
//! - **Covers**: `https://covers.openlibrary.org/b/id/{cover_id}-L.jpg` and `.../b/isbn/{isbn}-L.jpg`
//!
//! The covers CDN answers unknown ids with a tiny placeholder image instead
//! of a 404, so candidates are downloaded and judged by size.

use crate::error::{MetadataError, Result};
use crate::providers::{get, image_size, parse_json};
use crate::text::{author_last_name, clean_title, normalize, prefix_overlap};
use bridge_traits::http::HttpClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use urlencoding::encode;

/// Open Library API base URL
pub const OPEN_LIBRARY_API_BASE: &str = "https://openlibrary.org";

/// Open Library covers CDN
pub const OPEN_LIBRARY_COVERS_BASE: &str = "https://covers.openlibrary.org";

const SEARCH_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    title: Option<String>,
    cover_i: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BookData {
    cover: Option<BookCover>,
}

#[derive(Debug, Deserialize)]
struct BookCover {
    large: Option<String>,
}

/// Open Library client
pub struct OpenLibraryClient {
    http_client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl OpenLibraryClient {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }

    fn search_url(title: &str, author_last: &str) -> String {
        format!(
            "{}/search.json?title={}&author={}&limit={}",
            OPEN_LIBRARY_API_BASE,
            encode(title),
            encode(author_last),
            SEARCH_LIMIT
        )
    }

    pub fn cover_id_url(cover_id: i64) -> String {
        format!("{}/b/id/{}-L.jpg", OPEN_LIBRARY_COVERS_BASE, cover_id)
    }

    pub fn cover_isbn_url(isbn: &str) -> String {
        format!("{}/b/isbn/{}-L.jpg", OPEN_LIBRARY_COVERS_BASE, isbn)
    }

    /// Searches by cleaned title and author last name, retrying once with
    /// the raw title when the first search is rejected.
    ///
    /// Only candidates whose image is at least `min_image_bytes` are
    /// considered. The first one whose title overlaps the query wins;
    /// otherwise the first acceptable image is returned.
    pub async fn cover_by_title(
        &self,
        title: &str,
        author: &str,
        min_image_bytes: usize,
    ) -> Result<Option<String>> {
        let cleaned = clean_title(title);
        let last = author_last_name(author);

        let response = match get(
            self.http_client.as_ref(),
            &Self::search_url(&cleaned, &last),
            self.timeout,
        )
        .await
        {
            Ok(response) => response,
            Err(e @ MetadataError::HttpStatus { .. }) => {
                debug!(error = %e, "Open Library search rejected, retrying with raw title");
                get(
                    self.http_client.as_ref(),
                    &Self::search_url(title, &last),
                    self.timeout,
                )
                .await?
            }
            Err(e) => return Err(e),
        };
        let search: SearchResponse = parse_json(&response)?;

        let search_title = normalize(&cleaned);
        let mut first_valid: Option<String> = None;

        for doc in &search.docs {
            let Some(cover_id) = doc.cover_i else {
                continue;
            };
            let url = Self::cover_id_url(cover_id);

            match image_size(self.http_client.as_ref(), &url, self.timeout).await {
                Some(size) if size >= min_image_bytes => {}
                Some(size) => {
                    debug!(url = %url, size, "Skipping placeholder cover");
                    continue;
                }
                None => continue,
            }

            let result_title = normalize(doc.title.as_deref().unwrap_or_default());
            if prefix_overlap(&result_title, &search_title) {
                return Ok(Some(url));
            }
            first_valid.get_or_insert(url);
        }

        Ok(first_valid)
    }

    /// `cover.large` from the books data API.
    pub async fn data_cover_by_isbn(&self, isbn: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/api/books?bibkeys=ISBN:{}&format=json&jscmd=data",
            OPEN_LIBRARY_API_BASE,
            encode(isbn)
        );
        let response = get(self.http_client.as_ref(), &url, self.timeout).await?;
        let mut data: HashMap<String, BookData> = parse_json(&response)?;

        Ok(data
            .remove(&format!("ISBN:{}", isbn))
            .and_then(|book| book.cover)
            .and_then(|cover| cover.large))
    }

    /// Direct covers CDN URL for an ISBN, if the image is larger than
    /// `min_image_bytes`.
    pub async fn direct_cover_by_isbn(&self, isbn: &str, min_image_bytes: usize) -> Option<String> {
        let url = Self::cover_isbn_url(isbn);
        match image_size(self.http_client.as_ref(), &url, self.timeout).await {
            Some(size) if size > min_image_bytes => Some(url),
            _ => None,
        }
    }
}
