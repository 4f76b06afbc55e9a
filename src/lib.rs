//! # og-fetcher - Link-Preview Metadata for Rust
//!
//! Fetches a web page and reports the metadata a chat or feed client needs
//! to render a link preview: the document title, its Open Graph (`og:*`)
//! properties, the host it was finally served from and its MIME type.
//!
//! ## Features
//!
//! - URL validation with an optional non-standard port guard
//! - Manual redirect following with a hop limit
//! - Status, content type and declared length checks before reading
//! - Bounded body reads that never buffer past the ceiling
//! - Charset-aware decoding and head-only metadata extraction
//! - Per-attempt timeouts with retries on transport failures
//! - An LRU cache with idle expiry that coalesces concurrent requests
//!
//! Failures are data: every fetch yields a [`FetchOutcome`] holding either
//! metadata or a [`FetchError`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use og_fetcher::{FetcherConfig, FetcherService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = FetcherService::new(FetcherConfig::default())?;
//!
//!     let outcome = service.fetch("https://example.com").await;
//!     println!("{}", serde_json::to_string(&*outcome)?);
//!     Ok(())
//! }
//! ```

mod error;

pub mod cache;
pub mod fetcher;
pub mod outcome;
pub mod service;

pub use cache::DedupCache;
pub use error::{Error, Result};
pub use fetcher::{ErrorKind, FetchError, Fetcher, FetcherConfig, FetcherConfigBuilder, RetryPolicy};
pub use outcome::{FetchOutcome, FetchRequest, Metadata};
pub use service::FetcherService;

/// Re-exports of the commonly used types
pub mod prelude {
    pub use crate::fetcher::{FetchError, FetcherConfig, RetryPolicy};
    pub use crate::outcome::{FetchOutcome, FetchRequest, Metadata};
    pub use crate::service::FetcherService;
}
