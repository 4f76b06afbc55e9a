//! # Fetcher Service
//!
//! Public entry point: a [`Fetcher`] behind a [`DedupCache`] keyed by the
//! raw URL string. Concurrent requests for the same URL share one fetch,
//! and its outcome, error or not, is served to later requests until the
//! entry is evicted.

use std::sync::Arc;

use tracing::{Instrument, info_span};

use crate::cache::DedupCache;
use crate::error::Result;
use crate::fetcher::{FetchError, Fetcher, FetcherConfig};
use crate::outcome::{FetchOutcome, FetchRequest};

/// Caching, coalescing link-preview service
#[derive(Debug)]
pub struct FetcherService {
    fetcher: Arc<Fetcher>,
    cache: DedupCache<Arc<FetchOutcome>>,
}

impl FetcherService {
    /// Build a service from a configuration
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let capacity = config.non_zero_cache_capacity()?;
        let idle = config.cache_idle;
        let fetcher = Fetcher::new(config)?;

        Ok(Self {
            fetcher: Arc::new(fetcher),
            cache: DedupCache::new(capacity, idle),
        })
    }

    /// Metadata for `url`, from the cache or a fresh fetch.
    ///
    /// Blank input is answered without touching the cache. A started fetch
    /// keeps running when the caller is dropped; its outcome is cached.
    pub async fn fetch(&self, url: &str) -> Arc<FetchOutcome> {
        if url.trim().is_empty() {
            return Arc::new(FetchOutcome::Error(FetchError::UrlNotPresent));
        }

        let fetcher = self.fetcher.clone();
        let key = url.to_string();
        self.cache
            .get_or_load(url, move || {
                // Runs to completion even if every caller stops waiting.
                let span = info_span!("fetch", url = %key);
                let task = tokio::spawn(async move { fetcher.resolve(&key).await }.instrument(span));
                async move {
                    let outcome = task.await.unwrap_or_else(|error| {
                        FetchOutcome::Error(FetchError::Transport(error.to_string()))
                    });
                    Arc::new(outcome)
                }
            })
            .await
    }

    /// Handle a request envelope; a missing URL is reported as such
    pub async fn fetch_request(&self, request: &FetchRequest) -> Arc<FetchOutcome> {
        self.fetch(request.url.as_deref().unwrap_or_default()).await
    }

    /// Configuration in use
    pub fn config(&self) -> &FetcherConfig {
        self.fetcher.config()
    }

    /// The outcome cache
    pub fn cache(&self) -> &DedupCache<Arc<FetchOutcome>> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fetcher::RetryPolicy;
    use mockito::Server;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn service() -> Arc<FetcherService> {
        let config = FetcherConfig::builder()
            .handle_non_standard_ports(true)
            .retry(RetryPolicy::none())
            .build();
        Arc::new(FetcherService::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Shared</title></head></html>")
            .expect(1)
            .create_async()
            .await;

        let service = service();
        let url = format!("{}/page", server.url());
        let outcomes = futures::future::join_all((0..10).map(|_| {
            let service = service.clone();
            let url = url.clone();
            async move { service.fetch(&url).await }
        }))
        .await;

        assert!(outcomes.iter().all(|outcome| Arc::ptr_eq(outcome, &outcomes[0])));
        assert_eq!(
            outcomes[0].metadata().and_then(|metadata| metadata.title()),
            Some("Shared")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_outcome_is_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let service = service();
        let url = format!("{}/missing", server.url());
        let first = service.fetch(&url).await;
        let second = service.fetch(&url).await;

        assert_eq!(*first, FetchOutcome::Error(FetchError::InvalidStatus(404)));
        assert!(Arc::ptr_eq(&first, &second));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalidated_url_is_fetched_again() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head></head></html>")
            .expect(2)
            .create_async()
            .await;

        let service = service();
        let url = format!("{}/page", server.url());
        service.fetch(&url).await;
        assert!(service.cache().invalidate(&url).await);
        service.fetch(&url).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_finishes_after_caller_is_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            // Accept and never answer.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        let config = FetcherConfig::builder()
            .handle_non_standard_ports(true)
            .timeout(Duration::from_millis(100))
            .retry(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(10),
            })
            .build();
        let service = FetcherService::new(config).unwrap();
        let url = format!("http://{addr}/slow");

        let abandoned = tokio::time::timeout(Duration::from_millis(30), service.fetch(&url)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(accepted.load(Ordering::SeqCst), 3);

        let outcome = tokio::time::timeout(Duration::from_millis(50), service.fetch(&url))
            .await
            .expect("outcome already cached");
        assert_eq!(
            *outcome,
            FetchOutcome::Error(FetchError::Timeout(Duration::from_millis(100)))
        );
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_url_skips_cache() {
        let service = service();

        let outcome = service.fetch_request(&FetchRequest::default()).await;
        assert_eq!(*outcome, FetchOutcome::Error(FetchError::UrlNotPresent));

        let outcome = service.fetch("  ").await;
        assert_eq!(*outcome, FetchOutcome::Error(FetchError::UrlNotPresent));
        assert!(service.cache().is_empty().await);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = FetcherConfig::builder().cache_capacity(0).build();
        assert!(matches!(
            FetcherService::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
