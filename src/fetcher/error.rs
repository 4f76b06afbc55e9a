//! Error taxonomy for the fetch pipeline
//!
//! The `Display` text of every variant is the exact message handed back to
//! callers in the `error` field of an outcome.

use std::time::Duration;

use thiserror::Error;

/// Broad category of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or malformed URL, or a disallowed port
    Input,
    /// Bad status, broken redirect, or too many redirects
    Protocol,
    /// Missing or unsupported MIME type, or an oversized body
    Content,
    /// Timeout, connection failure, or a broken body stream
    Transport,
}

/// Error type for a single fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No URL supplied
    #[error("Url is not present")]
    UrlNotPresent,

    /// URL could not be parsed or is not an http(s) URL with a host
    #[error("Incorrect url")]
    IncorrectUrl,

    /// URL names a port other than the scheme default
    #[error("Handling of non-standard ports is disabled")]
    NonStandardPort,

    /// Status outside of 200/301/302
    #[error("Invalid response status {0}")]
    InvalidStatus(u16),

    /// 301/302 without a `Location` header
    #[error("Http redirect without location header")]
    RedirectWithoutLocation,

    /// Redirect chain longer than the configured maximum
    #[error("Too many consequent redirects")]
    TooManyRedirects,

    /// Response carried no `Content-Type`
    #[error("No content-type")]
    NoContentType,

    /// Response is not HTML
    #[error("Unsupported content-type")]
    UnsupportedContentType {
        /// MIME type the server declared
        mime: String,
    },

    /// Declared `Content-Length` is above the body ceiling
    #[error("Content is too big")]
    ContentTooBig {
        /// MIME type the server declared
        mime: String,
    },

    /// Attempt did not complete within the timeout
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection, TLS, body stream or decompression failure
    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UrlNotPresent | Self::IncorrectUrl | Self::NonStandardPort => ErrorKind::Input,
            Self::InvalidStatus(_) | Self::RedirectWithoutLocation | Self::TooManyRedirects => {
                ErrorKind::Protocol
            }
            Self::NoContentType
            | Self::UnsupportedContentType { .. }
            | Self::ContentTooBig { .. } => ErrorKind::Content,
            Self::Timeout(_) | Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Only transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// MIME type attached to content errors
    pub fn mime(&self) -> Option<&str> {
        match self {
            Self::UnsupportedContentType { mime } | Self::ContentTooBig { mime } => Some(mime),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Top-level message is generic; append the source chain.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message = format!("{message}: {cause}");
            source = cause.source();
        }
        Self::Transport(message)
    }
}
