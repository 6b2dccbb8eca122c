//! Google Books API Client
//!
//! ## API Endpoints
//!
//! - **Volume search**: `https://www.googleapis.com/books/v1/volumes?q={query}[&key={key}]`
//! - **Front cover fallback**: `https://books.google.com/books/content?id={id}&printsec=frontcover&img=1&zoom=1&source=gbs_api`
//!
//! ## API Key
//!
//! The key is optional. Without one requests are sent anonymously and are
//! subject to the lower shared quota.

use crate::error::Result;
use crate::providers::{get, parse_json};
use crate::text::{author_last_name, author_overlap, clean_title, normalize, prefix_overlap};
use bridge_traits::http::HttpClient;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use urlencoding::encode;

/// Google Books volume search endpoint
pub const GOOGLE_BOOKS_API_BASE: &str = "https://www.googleapis.com/books/v1/volumes";

/// Results requested per title-search query
const TITLE_SEARCH_MAX_RESULTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(default)]
    id: String,
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    medium: Option<String>,
    large: Option<String>,
    extra_large: Option<String>,
}

impl Volume {
    /// Thumbnail at full zoom, or the generic front-cover URL for the volume.
    fn cover_url(&self) -> String {
        match self
            .volume_info
            .image_links
            .as_ref()
            .and_then(|links| links.thumbnail.as_deref())
        {
            Some(thumbnail) => thumbnail.replacen("zoom=1", "zoom=0", 1),
            None => format!(
                "https://books.google.com/books/content?id={}&printsec=frontcover&img=1&zoom=1&source=gbs_api",
                self.id
            ),
        }
    }

    /// Largest image link available, upgraded for display at full size.
    fn largest_image(&self) -> Option<String> {
        let links = self.volume_info.image_links.as_ref()?;
        let url = links
            .extra_large
            .as_deref()
            .or(links.large.as_deref())
            .or(links.medium.as_deref())
            .or(links.thumbnail.as_deref())?;

        Some(
            url.replacen("http://", "https://", 1)
                .replacen("&zoom=1", "&zoom=3", 1)
                .replacen("&edge=curl", "", 1),
        )
    }
}

/// Google Books client
pub struct GoogleBooksClient {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    timeout: Duration,
}

impl GoogleBooksClient {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout,
        }
    }

    /// `query` must already be URL-safe.
    fn volumes_url(&self, query: &str, max_results: Option<u32>) -> String {
        let mut url = format!("{}?q={}", GOOGLE_BOOKS_API_BASE, query);
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(&encode(key));
        }
        if let Some(max) = max_results {
            url.push_str(&format!("&maxResults={}", max));
        }
        url
    }

    async fn volumes(&self, query: &str, max_results: Option<u32>) -> Result<Vec<Volume>> {
        let url = self.volumes_url(query, max_results);
        let response = get(self.http_client.as_ref(), &url, self.timeout).await?;
        let parsed: VolumesResponse = parse_json(&response)?;
        Ok(parsed.items)
    }

    /// Cover of the first volume matching an ISBN.
    pub async fn cover_by_isbn(&self, isbn: &str) -> Result<Option<String>> {
        let query = format!("isbn:{}", encode(isbn));
        let items = self.volumes(&query, None).await?;

        let cover = items.first().map(Volume::cover_url);
        if cover.is_none() {
            debug!(isbn, "No Google Books volume for ISBN");
        }
        Ok(cover)
    }

    /// Largest image of the first volume matching an ISBN, as used for
    /// previewing a replacement cover.
    pub async fn preview_by_isbn(&self, isbn: &str) -> Result<Option<String>> {
        let query = format!("isbn:{}", encode(isbn));
        let items = self.volumes(&query, None).await?;
        Ok(items.first().and_then(Volume::largest_image))
    }

    /// Searches by title and author with progressively looser queries.
    ///
    /// A volume matches when its title overlaps the cleaned title and its
    /// first author overlaps the requested author. Queries that fail are
    /// skipped.
    pub async fn cover_by_title(&self, title: &str, author: &str) -> Result<Option<String>> {
        let search_title = normalize(&clean_title(title));
        let search_author = normalize(author);

        for query in title_queries(title, author) {
            let items = match self.volumes(&query, Some(TITLE_SEARCH_MAX_RESULTS)).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(error = %e, "Google Books title query failed");
                    continue;
                }
            };

            let matched = items.iter().find(|item| {
                let result_title = normalize(item.volume_info.title.as_deref().unwrap_or_default());
                let result_author = normalize(
                    item.volume_info
                        .authors
                        .first()
                        .map(String::as_str)
                        .unwrap_or_default(),
                );
                prefix_overlap(&result_title, &search_title)
                    && author_overlap(&result_author, &search_author)
            });

            if let Some(volume) = matched {
                return Ok(Some(volume.cover_url()));
            }
        }

        debug!(title, author, "No Google Books title match");
        Ok(None)
    }
}

/// Query variants from most to least specific, already URL-encoded.
fn title_queries(title: &str, author: &str) -> Vec<String> {
    let cleaned = clean_title(title);
    let last = encode(&author_last_name(author)).into_owned();
    let words: Vec<String> = cleaned
        .split_whitespace()
        .map(|word| encode(word).into_owned())
        .collect();

    vec![
        format!("intitle:%22{}%22+inauthor:{}", encode(&cleaned), last),
        format!("intitle:%22{}%22+inauthor:{}", encode(title), last),
        format!("intitle:%22{}%22", encode(&cleaned)),
        format!("{}+{}", words.join("+"), last),
        format!(
            "{}+{}",
            words.iter().take(3).cloned().collect::<Vec<_>>().join("+"),
            last
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedHttp;
    use serde_json::json;

    fn client(http: Arc<ScriptedHttp>, key: Option<&str>) -> GoogleBooksClient {
        GoogleBooksClient::new(http, key.map(String::from), Duration::from_secs(5))
    }

    #[test]
    fn test_title_queries_order() {
        let queries = title_queries("The Hobbit (Middle-earth, #0)", "J.R.R. Tolkien");
        assert_eq!(queries.len(), 5);
        assert_eq!(queries[0], "intitle:%22The%20Hobbit%22+inauthor:Tolkien");
        assert!(queries[1].starts_with("intitle:%22The%20Hobbit%20%28Middle-earth"));
        assert_eq!(queries[2], "intitle:%22The%20Hobbit%22");
        assert_eq!(queries[3], "The+Hobbit+Tolkien");
        assert_eq!(queries[4], "The+Hobbit+Tolkien");
    }

    #[test]
    fn test_first_three_words_query() {
        let queries = title_queries("A Game of Thrones", "George R.R. Martin");
        assert_eq!(queries[3], "A+Game+of+Thrones+Martin");
        assert_eq!(queries[4], "A+Game+of+Martin");
    }

    #[test]
    fn test_volumes_url_with_and_without_key() {
        let http = Arc::new(ScriptedHttp::new());
        let keyless = client(http.clone(), None);
        assert_eq!(
            keyless.volumes_url("isbn:123", None),
            "https://www.googleapis.com/books/v1/volumes?q=isbn:123"
        );

        let keyed = client(http, Some("secret"));
        assert_eq!(
            keyed.volumes_url("isbn:123", Some(3)),
            "https://www.googleapis.com/books/v1/volumes?q=isbn:123&key=secret&maxResults=3"
        );
    }

    #[test]
    fn test_blank_key_is_ignored() {
        let keyed = client(Arc::new(ScriptedHttp::new()), Some("  "));
        assert!(!keyed.volumes_url("isbn:1", None).contains("key="));
    }

    #[tokio::test]
    async fn test_cover_by_isbn_uses_thumbnail_at_zoom_zero() {
        let http = Arc::new(ScriptedHttp::new().json(
            "q=isbn:9780441013593",
            json!({"items": [{"id": "B1", "volumeInfo": {
                "title": "Dune",
                "imageLinks": {"thumbnail": "http://books.google.com/books/content?id=B1&zoom=1&edge=curl"}
            }}]}),
        ));

        let cover = client(http, None)
            .cover_by_isbn("9780441013593")
            .await
            .unwrap();
        assert_eq!(
            cover.as_deref(),
            Some("http://books.google.com/books/content?id=B1&zoom=0&edge=curl")
        );
    }

    #[tokio::test]
    async fn test_cover_by_isbn_falls_back_to_front_cover_url() {
        let http = Arc::new(ScriptedHttp::new().json(
            "q=isbn:0441013597",
            json!({"items": [{"id": "XYZ", "volumeInfo": {"title": "Dune"}}]}),
        ));

        let cover = client(http, None).cover_by_isbn("0441013597").await.unwrap();
        assert_eq!(
            cover.as_deref(),
            Some("https://books.google.com/books/content?id=XYZ&printsec=frontcover&img=1&zoom=1&source=gbs_api")
        );
    }

    #[tokio::test]
    async fn test_cover_by_isbn_no_items() {
        let http = Arc::new(ScriptedHttp::new().json("q=isbn:", json!({"totalItems": 0})));
        assert!(client(http, None).cover_by_isbn("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cover_by_isbn_http_error_is_reported() {
        let http = Arc::new(ScriptedHttp::new().status("q=isbn:", 429));
        assert!(client(http, None).cover_by_isbn("1").await.is_err());
    }

    #[tokio::test]
    async fn test_cover_by_title_requires_title_and_author_match() {
        let http = Arc::new(ScriptedHttp::new().json(
            "volumes?q=",
            json!({"items": [
                {"id": "wrong", "volumeInfo": {"title": "Dune", "authors": ["Kevin J. Anderson"],
                    "imageLinks": {"thumbnail": "https://img/wrong?zoom=1"}}},
                {"id": "other", "volumeInfo": {"title": "Something Else", "authors": ["Frank Herbert"]}},
                {"id": "right", "volumeInfo": {"title": "Dune Messiah", "authors": ["Frank Herbert"],
                    "imageLinks": {"thumbnail": "https://img/right?zoom=1"}}}
            ]}),
        ));

        let cover = client(http.clone(), None)
            .cover_by_title("Dune Messiah (Dune #2)", "Frank Herbert")
            .await
            .unwrap();
        assert_eq!(cover.as_deref(), Some("https://img/right?zoom=0"));
        assert_eq!(http.count_matching("maxResults=3"), 1);
    }

    #[tokio::test]
    async fn test_cover_by_title_matches_non_latin_titles() {
        let http = Arc::new(ScriptedHttp::new().json(
            "volumes?q=",
            json!({"items": [{"id": "wp", "volumeInfo": {"title": "Война и мир", "authors": ["Лев Толстой"],
                "imageLinks": {"thumbnail": "https://img/wp?zoom=1"}}}]}),
        ));

        let cover = client(http.clone(), None)
            .cover_by_title("Война и мир", "Лев Толстой")
            .await
            .unwrap();
        assert_eq!(cover.as_deref(), Some("https://img/wp?zoom=0"));
        assert_eq!(http.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_cover_by_title_tries_every_query_then_gives_up() {
        let http = Arc::new(ScriptedHttp::new().fail("volumes?q="));
        let cover = client(http.clone(), None)
            .cover_by_title("Nonexistent Book", "Nobody")
            .await
            .unwrap();
        assert!(cover.is_none());
        assert_eq!(http.requested().len(), 5);
    }

    #[tokio::test]
    async fn test_preview_prefers_largest_image() {
        let http = Arc::new(ScriptedHttp::new().json(
            "q=isbn:123",
            json!({"items": [{"id": "A", "volumeInfo": {"imageLinks": {
                "thumbnail": "http://t?id=A&zoom=1",
                "medium": "http://books.google.com/m?id=A&zoom=1&edge=curl"
            }}}]}),
        ));

        let preview = client(http, None).preview_by_isbn("123").await.unwrap();
        assert_eq!(
            preview.as_deref(),
            Some("https://books.google.com/m?id=A&zoom=3")
        );
    }
}
