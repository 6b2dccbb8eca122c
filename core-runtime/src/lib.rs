//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the library crates:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for import progress and library changes

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
