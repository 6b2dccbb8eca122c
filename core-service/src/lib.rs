//! Core service façade and bootstrap helpers.
//!
//! This crate wires the configured HTTP client and database into the
//! library core and exposes the operations a front end needs:
//! importing an export, adding, re-covering and deleting books, listing
//! views and comparing two users' libraries.
//!
//! Hosts usually enable the `desktop-shims` feature, which lets
//! [`CoreConfig`] fall back to the reqwest-based HTTP client.

pub mod error;
pub mod library;
pub mod session;

pub use error::{Result, ServiceError};
pub use library::{Comparison, ImportSummary, LibraryService, NewBook};
pub use session::Session;

use core_library::db::{create_pool, DatabaseConfig};
use core_metadata::{CoverResolver, IsbnCoverPreview};
use core_runtime::config::CoreConfig;
use core_runtime::error::Error as RuntimeError;
use std::sync::Arc;
use tracing::info;

/// Opens the database (applying migrations) and assembles a
/// [`LibraryService`] with the default cover providers.
///
/// ```ignore
/// let config = CoreConfig::builder().database_path("readlist.db").build()?;
/// let service = core_service::bootstrap(&config).await?;
/// let me = service.session_for("alice").await?;
/// ```
pub async fn bootstrap(config: &CoreConfig) -> Result<LibraryService> {
    let http_client = config
        .http_client
        .clone()
        .ok_or_else(|| RuntimeError::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "CoreConfig has no HTTP client".to_string(),
        })?;

    let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;

    let resolver = CoverResolver::with_defaults(http_client.clone(), &config.cover_api);
    let preview = IsbnCoverPreview::new(http_client, &config.cover_api);

    info!(
        database = %config.database_path.display(),
        google_books_key = config.cover_api.has_google_books_key(),
        "Library service ready"
    );

    Ok(LibraryService::new(
        pool,
        Arc::new(resolver),
        Arc::new(preview),
        config.enrichment,
    ))
}
