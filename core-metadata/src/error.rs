use thiserror::Error;

/// Failures raised by a single cover provider.
///
/// These never escape the resolver cascade: a strategy that errors is logged
/// and treated as a miss.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Provider returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to parse provider response: {0}")]
    JsonParse(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
