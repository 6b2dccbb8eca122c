//! # Host Bridge Traits
//!
//! Platform seams the readlist core depends on but does not implement itself.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP GET/POST used by the cover providers
//! - [`Clock`](time::Clock) - Time source, swapped for a fixed clock in tests
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert transport-specific failures into it; callers in `core-metadata`
//! treat every bridge error from a cover provider as "no result".
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` so a single client can be shared
//! across the concurrent lookups of an enrichment batch.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, FixedClock, LogLevel, SystemClock};
