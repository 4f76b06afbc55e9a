//! # Fetch Pipeline
//!
//! Turns a URL into link-preview metadata, one redirect hop at a time:
//!
//! 1. validate the URL and, unless allowed, reject non-default ports
//! 2. send a GET (gzip, brotli and deflate are decoded transparently)
//! 3. gate the response on status, content type and declared length
//! 4. read the body up to the ceiling and decode it with its charset
//! 5. pull the title and `og:*` properties out of the document head
//!
//! Steps 2 to 5 run under a per-attempt timeout and are retried on
//! transport failures only. Every failure ends up as a [`FetchError`]
//! inside a [`FetchOutcome`]; nothing escapes as a panic or an HTTP error
//! status.

mod body;
mod config;
mod error;
mod extract;
mod retry;
mod target;
mod validate;

pub use body::{BoundedBody, decode, read_bounded};
pub use config::{DEFAULT_MAX_BODY_SIZE, FetcherConfig, FetcherConfigBuilder};
pub use error::{ErrorKind, FetchError};
pub use extract::extract_metadata;
pub use retry::RetryPolicy;
pub use target::Target;
pub use validate::{ContentInfo, HTML_MIME, Verdict, content_info, validate};

use std::future::Future;

use reqwest::Client as ReqwestClient;
use reqwest::redirect::Policy;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::outcome::{FetchOutcome, Metadata};

/// Position in a redirect chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectState {
    /// URL to request next
    pub target: Target,
    /// Number of redirects followed to reach `target`
    pub redirects: u32,
}

impl RedirectState {
    /// Start of a chain
    pub fn new(target: Target) -> Self {
        Self {
            target,
            redirects: 0,
        }
    }

    /// Move to the next hop
    pub fn advance(&mut self, next: Target) {
        self.target = next;
        self.redirects += 1;
    }
}

/// Result of one request
#[derive(Debug)]
enum Step {
    Redirect(String),
    Page(Metadata),
}

/// Fetches link-preview metadata over HTTP
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: ReqwestClient,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a fetcher with the given configuration
    pub fn new(config: FetcherConfig) -> Result<Self> {
        config.validate()?;

        let client = ReqwestClient::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Configuration in use
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch `url`, following redirects, and describe the result
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, url: &str) -> FetchOutcome {
        let outcome = FetchOutcome::from(self.follow_redirects(url).await);
        if let FetchOutcome::Error(error) = &outcome {
            debug!(%error, kind = ?error.kind(), "fetch failed");
        }
        outcome
    }

    async fn follow_redirects(&self, url: &str) -> std::result::Result<Metadata, FetchError> {
        self.walk_redirects(url, |target| async move { self.fetch_with_retry(&target).await })
            .await
    }

    /// Redirect loop over an arbitrary per-hop fetch.
    ///
    /// The hop limit and port guard are checked before `fetch` sees a target.
    async fn walk_redirects<F, Fut>(
        &self,
        url: &str,
        mut fetch: F,
    ) -> std::result::Result<Metadata, FetchError>
    where
        F: FnMut(Target) -> Fut,
        Fut: Future<Output = std::result::Result<Step, FetchError>>,
    {
        let mut state = RedirectState::new(Target::parse(url)?);

        loop {
            if state.redirects > self.config.max_redirects {
                return Err(FetchError::TooManyRedirects);
            }
            if !self.config.handle_non_standard_ports {
                state.target.ensure_standard_port()?;
            }

            match fetch(state.target.clone()).await? {
                Step::Page(metadata) => return Ok(metadata),
                Step::Redirect(location) => {
                    let next = state.target.follow(&location)?;
                    debug!(from = %state.target, to = %next, redirects = state.redirects + 1, "following redirect");
                    state.advance(next);
                }
            }
        }
    }

    /// Run attempts until one succeeds, fails permanently, or the retry
    /// policy gives up
    async fn fetch_with_retry(&self, target: &Target) -> std::result::Result<Step, FetchError> {
        let timeout = self.config.timeout;
        let mut attempt = 1;

        loop {
            let result = tokio::time::timeout(timeout, self.attempt(target))
                .await
                .unwrap_or(Err(FetchError::Timeout(timeout)));

            let error = match result {
                Err(error) if error.is_retryable() => error,
                other => return other,
            };

            match self.config.retry.backoff(attempt) {
                Some(delay) => {
                    debug!(%target, attempt, %error, ?delay, "retrying after transport failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(%target, attempt, %error, "giving up after transport failure");
                    return Err(error);
                }
            }
        }
    }

    /// One request: send, validate, read and extract.
    ///
    /// The response is dropped on every return path, which releases the
    /// connection.
    async fn attempt(&self, target: &Target) -> std::result::Result<Step, FetchError> {
        debug!(
            scheme = target.scheme(),
            host = target.host(),
            port = target.port(),
            "sending request"
        );
        let response = self.client.get(target.as_url().clone()).send().await?;

        let verdict = validate(
            response.status(),
            response.headers(),
            self.config.max_body_size,
        )?;

        match verdict {
            Verdict::Redirect(location) => Ok(Step::Redirect(location)),
            Verdict::Html(info) => {
                let body = read_bounded(
                    response.bytes_stream(),
                    self.config.max_body_size,
                    info.charset.as_deref(),
                )
                .await?;
                debug!(bytes = body.len, truncated = body.truncated, "body read");

                let mut metadata = extract_metadata(&body.text);
                metadata.insert(Metadata::HOSTNAME, target.host());
                metadata.insert(Metadata::MIME, info.mime);
                Ok(Step::Page(metadata))
            }
        }
    }
}
