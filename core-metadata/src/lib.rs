//! # Cover Metadata
//!
//! Finds cover imagery for books and enriches imported records with it.
//!
//! ## Overview
//!
//! - [`text`] - title/author normalization used for fuzzy matching
//! - [`providers`] - Google Books, Open Library and Amazon clients
//! - [`resolver`] - ordered strategy chain used during import
//! - [`preview`] - ISBN cascade used for manual adds and cover changes
//! - [`enrichment`] - batched, rate-spaced enrichment of imported records
//!
//! All network access goes through the [`HttpClient`](bridge_traits::HttpClient)
//! bridge trait, so every provider can be tested against canned responses.

pub mod enrichment;
pub mod error;
pub mod preview;
pub mod providers;
pub mod resolver;
pub mod text;

pub use enrichment::EnrichmentPipeline;
pub use error::{MetadataError, Result};
pub use preview::IsbnCoverPreview;
pub use resolver::{
    CoverLookup, CoverLookupResult, CoverQuery, CoverResolver, CoverSource, CoverStrategy,
};
