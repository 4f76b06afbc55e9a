//! Error types for the og-fetcher crate

use thiserror::Error;

/// Result type for og-fetcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for og-fetcher operations
///
/// Fetch failures are not reported through this type; they are data and
/// travel inside [`crate::FetchOutcome::Error`]. This enum covers the things
/// that stop a fetcher from being built at all.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration rejected before the fetcher was built
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
