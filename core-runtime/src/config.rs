//! # Core Configuration Module
//!
//! Configuration for the reading-library core.
//!
//! ## Overview
//!
//! A builder assembles a `CoreConfig` holding the database location, the
//! outbound HTTP client and the tuning knobs for cover lookups and import
//! enrichment. `build()` validates everything up front so that a bad value
//! fails at startup rather than halfway through an import.
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest, behind the
//!   `desktop-shims` feature)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, EnrichmentSettings};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/readlist.db")
//!     .google_books_api_key("AIza...")
//!     .enrichment(EnrichmentSettings::default().with_batch_size(10))
//!     .build()?;
//! ```
//!
//! Environment-driven setup is available through [`CoreConfig::from_env`].

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const ENV_DATABASE: &str = "READLIST_DATABASE";
pub const ENV_GOOGLE_BOOKS_API_KEY: &str = "GOOGLE_BOOKS_API_KEY";
pub const ENV_BATCH_SIZE: &str = "READLIST_BATCH_SIZE";
pub const ENV_BATCH_DELAY_MS: &str = "READLIST_BATCH_DELAY_MS";

const MAX_BATCH_DELAY_MS: u64 = 60_000;
const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// HTTP client for cover lookups (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Cover provider configuration
    pub cover_api: CoverApiConfig,

    /// Import enrichment batching
    pub enrichment: EnrichmentSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("cover_api", &self.cover_api)
            .field("enrichment", &self.enrichment)
            .finish()
    }
}

/// Configuration for the external cover providers.
///
/// Google Books accepts anonymous requests at a low quota; supplying an API
/// key raises it. Open Library and the Amazon image CDN need no credentials.
///
/// # Example
///
/// ```
/// use core_runtime::config::CoverApiConfig;
///
/// let config = CoverApiConfig::new().with_google_books_api_key("AIza-example");
/// assert!(config.has_google_books_key());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CoverApiConfig {
    /// Google Books API key appended as `&key=` when present
    pub google_books_api_key: Option<String>,

    /// Per-request timeout in milliseconds (default 5000)
    pub request_timeout_ms: u64,

    /// Cover images smaller than this are provider placeholders (default 5000)
    pub placeholder_threshold_bytes: usize,

    /// Minimum image size accepted by the ISBN preview cascade (default 1000)
    pub preview_min_bytes: usize,
}

impl Default for CoverApiConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CoverApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverApiConfig")
            .field(
                "google_books_api_key",
                &self.google_books_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field(
                "placeholder_threshold_bytes",
                &self.placeholder_threshold_bytes,
            )
            .field("preview_min_bytes", &self.preview_min_bytes)
            .finish()
    }
}

impl CoverApiConfig {
    pub fn new() -> Self {
        Self {
            google_books_api_key: None,
            request_timeout_ms: 5_000,
            placeholder_threshold_bytes: 5_000,
            preview_min_bytes: 1_000,
        }
    }

    pub fn with_google_books_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_books_api_key = Some(key.into());
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_placeholder_threshold_bytes(mut self, bytes: usize) -> Self {
        self.placeholder_threshold_bytes = bytes;
        self
    }

    pub fn with_preview_min_bytes(mut self, bytes: usize) -> Self {
        self.preview_min_bytes = bytes;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn has_google_books_key(&self) -> bool {
        self.google_books_api_key.is_some()
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref key) = self.google_books_api_key {
            if key.trim().is_empty() {
                return Err(Error::Config(
                    "Google Books API key cannot be empty; omit it instead".to_string(),
                ));
            }
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::Config(
                "Request timeout must be greater than 0ms".to_string(),
            ));
        }

        if self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 60 seconds (60,000ms)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Batching for import enrichment.
///
/// Lookups inside a batch run concurrently; the delay separates consecutive
/// batches and is not applied after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentSettings {
    /// Records per batch (default 5)
    pub batch_size: usize,

    /// Pause between batches in milliseconds (default 1000)
    pub batch_delay_ms: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 1_000,
        }
    }
}

impl EnrichmentSettings {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.batch_delay_ms = delay_ms;
        self
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config(
                "Enrichment batch size must be greater than 0".to_string(),
            ));
        }

        if self.batch_delay_ms > MAX_BATCH_DELAY_MS {
            return Err(Error::Config(
                "Batch delay exceeds maximum of 60 seconds (60,000ms)".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builds a configuration from `READLIST_*` and `GOOGLE_BOOKS_API_KEY`
    /// environment variables.
    ///
    /// `READLIST_DATABASE` is required. Unset tuning variables keep their
    /// defaults; set but unparsable ones are configuration errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(path) = lookup(ENV_DATABASE) {
            builder = builder.database_path(path);
        }

        if let Some(key) = lookup(ENV_GOOGLE_BOOKS_API_KEY) {
            builder = builder.google_books_api_key(key);
        }

        let mut enrichment = EnrichmentSettings::default();
        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            enrichment.batch_size = parse_env(ENV_BATCH_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BATCH_DELAY_MS) {
            enrichment.batch_delay_ms = parse_env(ENV_BATCH_DELAY_MS, &raw)?;
        }

        builder.enrichment(enrichment).build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        self.cover_api.validate()?;
        self.enrichment.validate()?;

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", name, raw)))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(cover_api: &CoverApiConfig) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(cover_api.request_timeout()).map_err(|e| {
        Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: e.to_string(),
        }
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_cover_api: &CoverApiConfig) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HttpClient injected. Enable the 'desktop-shims' feature to use \
                  the reqwest client, or call CoreConfigBuilder::http_client."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    cover_api: Option<CoverApiConfig>,
    google_books_api_key: Option<String>,
    enrichment: Option<EnrichmentSettings>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/path/to/readlist.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Replaces the whole cover provider configuration.
    pub fn cover_api(mut self, config: CoverApiConfig) -> Self {
        self.cover_api = Some(config);
        self
    }

    /// Sets the Google Books API key, overriding any key in `cover_api`.
    pub fn google_books_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_books_api_key = Some(key.into());
        self
    }

    /// Sets the enrichment batching.
    pub fn enrichment(mut self, settings: EnrichmentSettings) -> Self {
        self.enrichment = Some(settings);
        self
    }

    /// Builds and validates the final `CoreConfig`.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the database path is missing or a value is out
    ///   of range
    /// - `Error::CapabilityMissing` when no HTTP client is injected and no
    ///   default is available
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self
            .database_path
            .ok_or_else(|| Error::Config("Database path is required".to_string()))?;

        let mut cover_api = self.cover_api.unwrap_or_default();
        if let Some(key) = self.google_books_api_key {
            cover_api.google_books_api_key = Some(key);
        }

        let http_client = match self.http_client {
            Some(client) => Some(client),
            None => Some(provide_default_http_client(&cover_api)?),
        };

        let config = CoreConfig {
            database_path,
            http_client,
            cover_api,
            enrichment: self.enrichment.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
