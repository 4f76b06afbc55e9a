//! Request and result types shared by the fetcher, the cache and callers

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::fetcher::FetchError;

/// Inbound request envelope, `{"url": "..."}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Raw user-supplied URL
    #[serde(default)]
    pub url: Option<String>,
}

impl FetchRequest {
    /// Create a request for a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

/// Link-preview metadata: title, `og:*` properties, hostname and MIME type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// Key of the document title
    pub const TITLE: &'static str = "title";
    /// Key of the final host name
    pub const HOSTNAME: &'static str = "hostname";
    /// Key of the response MIME type
    pub const MIME: &'static str = "mime";

    /// Set a value, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Document title, if the head had one
    pub fn title(&self) -> Option<&str> {
        self.get(Self::TITLE)
    }

    /// Host of the final URL after redirects
    pub fn hostname(&self) -> Option<&str> {
        self.get(Self::HOSTNAME)
    }

    /// MIME type of the response
    pub fn mime(&self) -> Option<&str> {
        self.get(Self::MIME)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Metadata {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Result of one fetch: metadata or a structured error, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page metadata
    Metadata(Metadata),
    /// Why the page could not be previewed
    Error(FetchError),
}

impl FetchOutcome {
    /// Whether this is an error outcome
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Metadata, if the fetch succeeded
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Metadata(metadata) => Some(metadata),
            Self::Error(_) => None,
        }
    }

    /// Error, if the fetch failed
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Metadata(_) => None,
            Self::Error(error) => Some(error),
        }
    }

    /// Flat key-value form, as sent to clients
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match self {
            Self::Metadata(metadata) => metadata.0.clone(),
            Self::Error(error) => {
                let mut map = BTreeMap::new();
                map.insert("error".to_string(), error.to_string());
                if let Some(mime) = error.mime() {
                    map.insert(Metadata::MIME.to_string(), mime.to_string());
                }
                map
            }
        }
    }
}

impl From<Result<Metadata, FetchError>> for FetchOutcome {
    fn from(result: Result<Metadata, FetchError>) -> Self {
        match result {
            Ok(metadata) => Self::Metadata(metadata),
            Err(error) => Self::Error(error),
        }
    }
}

impl From<FetchError> for FetchOutcome {
    fn from(error: FetchError) -> Self {
        Self::Error(error)
    }
}

impl Serialize for FetchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Metadata(metadata) => metadata.serialize(serializer),
            Self::Error(error) => {
                let mime = error.mime();
                let mut map = serializer.serialize_map(Some(1 + usize::from(mime.is_some())))?;
                map.serialize_entry("error", &error.to_string())?;
                if let Some(mime) = mime {
                    map.serialize_entry(Metadata::MIME, mime)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_serializes_flat() {
        let mut metadata = Metadata::default();
        metadata.insert(Metadata::TITLE, "Hi");
        metadata.insert("og:title", "Hi There");
        metadata.insert(Metadata::HOSTNAME, "example.com");
        metadata.insert(Metadata::MIME, "text/html");

        let value = serde_json::to_value(FetchOutcome::Metadata(metadata)).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "Hi",
                "og:title": "Hi There",
                "hostname": "example.com",
                "mime": "text/html"
            })
        );
    }

    #[test]
    fn test_error_serializes_with_optional_mime() {
        let value = serde_json::to_value(FetchOutcome::Error(FetchError::IncorrectUrl)).unwrap();
        assert_eq!(value, json!({ "error": "Incorrect url" }));

        let outcome = FetchOutcome::from(FetchError::UnsupportedContentType {
            mime: "image/png".to_string(),
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({ "error": "Unsupported content-type", "mime": "image/png" })
        );
        assert_eq!(serde_json::to_value(outcome.to_map()).unwrap(), value);
    }

    #[test]
    fn test_exactly_one_variant() {
        let ok = FetchOutcome::from(Ok::<_, FetchError>(Metadata::default()));
        assert!(!ok.is_error());
        assert!(ok.metadata().is_some());
        assert!(ok.error().is_none());

        let err = FetchOutcome::from(Err::<Metadata, _>(FetchError::NoContentType));
        assert!(err.is_error());
        assert!(err.metadata().is_none());
        assert_eq!(err.error(), Some(&FetchError::NoContentType));
    }

    #[test]
    fn test_request_envelope() {
        let request: FetchRequest = serde_json::from_str(r#"{"url": "https://example.com"}"#).unwrap();
        assert_eq!(request, FetchRequest::new("https://example.com"));

        let request: FetchRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.url, None);
    }
}
