//! URL validation for the fetch pipeline

use url::Url;

use crate::fetcher::FetchError;

/// A URL that passed validation and may be requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
}

impl Target {
    /// Validate a raw URL string.
    ///
    /// Blank input is [`FetchError::UrlNotPresent`]; anything that does not
    /// parse as an `http`/`https` URL with a host is
    /// [`FetchError::IncorrectUrl`].
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        if raw.trim().is_empty() {
            return Err(FetchError::UrlNotPresent);
        }
        Self::from_url(Url::parse(raw).map_err(|_| FetchError::IncorrectUrl)?)
    }

    /// Resolve a `Location` header value against this URL
    pub fn follow(&self, location: &str) -> Result<Self, FetchError> {
        if location.trim().is_empty() {
            return Err(FetchError::UrlNotPresent);
        }
        Self::from_url(self.url.join(location).map_err(|_| FetchError::IncorrectUrl)?)
    }

    fn from_url(url: Url) -> Result<Self, FetchError> {
        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(FetchError::IncorrectUrl),
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(FetchError::IncorrectUrl);
        }
        Ok(Self { url })
    }

    /// Fail when the URL names a port other than the scheme default.
    ///
    /// `Url` drops an explicit default port while parsing, so any port still
    /// present is non-standard.
    pub fn ensure_standard_port(&self) -> Result<(), FetchError> {
        match self.url.port() {
            Some(_) => Err(FetchError::NonStandardPort),
            None => Ok(()),
        }
    }

    /// Host name of the URL
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Port of the URL, including the scheme default
    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or_default()
    }

    /// Scheme of the URL
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// The parsed URL
    pub fn as_url(&self) -> &Url {
        &self.url
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.url.fmt(f)
    }
}
