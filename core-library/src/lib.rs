//! # Library Management Module
//!
//! Owns the reading-library data model and its persistence.
//!
//! ## Overview
//!
//! - Library-export ingestion ([`ingest`])
//! - Domain records and persisted rows ([`models`])
//! - Shelf derivation and two-user comparison ([`comparison`])
//! - In-memory playlist views: search, year and shelf filters ([`filter`])
//! - SQLite schema, migrations and repositories ([`db`], [`repositories`])

pub mod comparison;
pub mod db;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
