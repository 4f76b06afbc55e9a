//! # Fetcher Configuration Module
//!
//! Limits and switches for the fetch pipeline and its cache, with a builder
//! for overriding individual values.
//!
//! ## Defaults
//!
//! - 8 MiB body ceiling
//! - one redirect hop
//! - default ports only (80 for http, 443 for https)
//! - 10 second timeout per attempt, up to 3 attempts
//! - 1000 cached URLs, dropped after 10 minutes without access

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetcher::RetryPolicy;

/// Default body ceiling in bytes
pub const DEFAULT_MAX_BODY_SIZE: u64 = 8 * 1024 * 1024;

/// Configuration for the fetcher and its cache
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Maximum number of body bytes buffered per response
    pub max_body_size: u64,

    /// Maximum number of 301/302 hops followed
    pub max_redirects: u32,

    /// Whether URLs with a non-default port may be fetched
    pub handle_non_standard_ports: bool,

    /// Timeout for one attempt (request, validation and body read)
    pub timeout: Duration,

    /// Retry policy for transport failures
    pub retry: RetryPolicy,

    /// User agent sent with every request
    pub user_agent: String,

    /// Maximum number of URLs kept in the cache
    pub cache_capacity: usize,

    /// Idle time after which a cached URL is dropped
    pub cache_idle: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_redirects: 1,
            handle_non_standard_ports: false,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            user_agent: format!("og-fetcher/{}", env!("CARGO_PKG_VERSION")),
            cache_capacity: 1000,
            cache_idle: Duration::from_secs(10 * 60),
        }
    }
}

impl FetcherConfig {
    /// Create a new builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        self.non_zero_cache_capacity()?;
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry policy must allow at least one attempt".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Cache capacity as the non-zero count the cache takes
    pub fn non_zero_cache_capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.cache_capacity)
            .ok_or_else(|| Error::InvalidConfig("cache capacity must be at least 1".to_string()))
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the body ceiling in bytes
    pub fn max_body_size(mut self, max_body_size: u64) -> Self {
        self.config.max_body_size = max_body_size;
        self
    }

    /// Set the maximum number of redirects to follow
    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    /// Allow or forbid URLs with non-default ports
    pub fn handle_non_standard_ports(mut self, handle: bool) -> Self {
        self.config.handle_non_standard_ports = handle;
        self
    }

    /// Set the per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the maximum number of attempts, keeping the backoff delays
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.retry.max_attempts = max_attempts;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the number of URLs kept in the cache
    pub fn cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.config.cache_capacity = cache_capacity;
        self
    }

    /// Set the idle expiry of cached URLs
    pub fn cache_idle(mut self, cache_idle: Duration) -> Self {
        self.config.cache_idle = cache_idle;
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}
