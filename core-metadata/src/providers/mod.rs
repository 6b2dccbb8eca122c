//! External Cover Providers
//!
//! Thin clients for the services that host cover imagery:
//! - Google Books - volume search by ISBN or title/author
//! - Open Library - title search, ISBN data API and the covers CDN
//! - Amazon - direct product image by ISBN
//!
//! Every call is a single `GET` with the configured timeout. Clients report
//! failures as [`MetadataError`]; deciding that a failure means "no cover" is
//! left to the resolver and the preview cascade.

pub mod amazon;
pub mod google_books;
pub mod open_library;

pub use amazon::AmazonCovers;
pub use google_books::GoogleBooksClient;
pub use open_library::OpenLibraryClient;

use crate::error::{MetadataError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::logging::redact_url;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("readlist/", env!("CARGO_PKG_VERSION"));

/// Issues a `GET` and turns non-2xx statuses into [`MetadataError::HttpStatus`].
pub(crate) async fn get(
    http: &dyn HttpClient,
    url: &str,
    timeout: Duration,
) -> Result<HttpResponse> {
    let request = HttpRequest::get(url)
        .header("User-Agent", USER_AGENT)
        .timeout(timeout);

    let response = http.execute(request).await?;
    if !response.is_success() {
        return Err(MetadataError::HttpStatus {
            status: response.status,
            url: redact_url(url),
        });
    }
    Ok(response)
}

/// Downloads an image and reports its size, or `None` when it cannot be
/// fetched at all.
pub(crate) async fn image_size(http: &dyn HttpClient, url: &str, timeout: Duration) -> Option<usize> {
    match get(http, url, timeout).await {
        Ok(response) => Some(response.content_length()),
        Err(e) => {
            debug!(url, error = %e, "Cover image unavailable");
            None
        }
    }
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| MetadataError::JsonParse(e.to_string()))
}
