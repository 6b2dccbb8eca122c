//! Amazon product images.
//!
//! Amazon serves a cover for most ISBN-10s at a predictable URL and a
//! one-pixel GIF when it has none.

use crate::providers::image_size;
use bridge_traits::http::HttpClient;
use std::sync::Arc;
use std::time::Duration;

pub const AMAZON_IMAGES_BASE: &str = "https://images-na.ssl-images-amazon.com/images/P";

pub struct AmazonCovers {
    http_client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl AmazonCovers {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }

    pub fn image_url(isbn: &str) -> String {
        format!("{}/{}.jpg", AMAZON_IMAGES_BASE, isbn)
    }

    /// Image URL for the ISBN when the served image is larger than
    /// `min_image_bytes`.
    pub async fn cover_by_isbn(&self, isbn: &str, min_image_bytes: usize) -> Option<String> {
        let url = Self::image_url(isbn);
        match image_size(self.http_client.as_ref(), &url, self.timeout).await {
            Some(size) if size > min_image_bytes => Some(url),
            _ => None,
        }
    }
}
