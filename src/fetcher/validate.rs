//! Response gating before any body bytes are read

use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, LOCATION};

use crate::fetcher::FetchError;

/// The only MIME type the extractor handles
pub const HTML_MIME: &str = "text/html";

/// What to do with a response that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Follow the `Location` header value
    Redirect(String),
    /// Read the body as HTML
    Html(ContentInfo),
}

/// Content metadata taken from the response headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    /// Lowercased type/subtype without parameters
    pub mime: String,
    /// `charset` parameter, if declared
    pub charset: Option<String>,
}

/// Decide on a response from its status and headers.
///
/// Checks run in order: redirect, status, content type, declared length.
pub fn validate(
    status: StatusCode,
    headers: &HeaderMap,
    max_body_size: u64,
) -> Result<Verdict, FetchError> {
    if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
        let location = headers
            .get(LOCATION)
            .ok_or(FetchError::RedirectWithoutLocation)?
            .to_str()
            .map_err(|_| FetchError::IncorrectUrl)?;
        return Ok(Verdict::Redirect(location.to_string()));
    }

    if status != StatusCode::OK {
        return Err(FetchError::InvalidStatus(status.as_u16()));
    }

    let info = content_info(headers).ok_or(FetchError::NoContentType)?;
    if info.mime != HTML_MIME {
        return Err(FetchError::UnsupportedContentType { mime: info.mime });
    }

    if declared_length(headers).is_some_and(|length| length > max_body_size) {
        return Err(FetchError::ContentTooBig { mime: info.mime });
    }

    Ok(Verdict::Html(info))
}

/// Parse `Content-Type` into MIME type and charset
pub fn content_info(headers: &HeaderMap) -> Option<ContentInfo> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mut parts = value.split(';');
    let mime = parts.next()?.trim().to_ascii_lowercase();
    if mime.is_empty() {
        return None;
    }

    let charset = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|charset| !charset.is_empty())
    });

    Some(ContentInfo { mime, charset })
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_redirect_with_location() {
        let verdict = validate(
            StatusCode::FOUND,
            &headers(&[("location", "https://example.com/next")]),
            1024,
        );
        assert_eq!(
            verdict,
            Ok(Verdict::Redirect("https://example.com/next".to_string()))
        );
    }

    #[test]
    fn test_redirect_without_location() {
        let verdict = validate(StatusCode::MOVED_PERMANENTLY, &HeaderMap::new(), 1024);
        assert_eq!(verdict, Err(FetchError::RedirectWithoutLocation));
    }

    #[test]
    fn test_other_statuses_are_rejected() {
        for code in [201u16, 204, 303, 307, 308, 404, 500] {
            let status = StatusCode::from_u16(code).unwrap();
            let verdict = validate(status, &headers(&[("content-type", "text/html")]), 1024);
            assert_eq!(verdict, Err(FetchError::InvalidStatus(code)));
        }
    }

    #[test]
    fn test_missing_content_type() {
        assert_eq!(
            validate(StatusCode::OK, &HeaderMap::new(), 1024),
            Err(FetchError::NoContentType)
        );
    }

    #[test]
    fn test_unsupported_content_type_carries_mime() {
        let verdict = validate(
            StatusCode::OK,
            &headers(&[("content-type", "text/plain; charset=utf-8")]),
            1024,
        );
        assert_eq!(
            verdict,
            Err(FetchError::UnsupportedContentType {
                mime: "text/plain".to_string()
            })
        );
    }

    #[test]
    fn test_declared_length_over_ceiling() {
        let verdict = validate(
            StatusCode::OK,
            &headers(&[("content-type", "text/html"), ("content-length", "2048")]),
            1024,
        );
        assert_eq!(
            verdict,
            Err(FetchError::ContentTooBig {
                mime: "text/html".to_string()
            })
        );
    }

    #[test]
    fn test_html_passes_with_charset() {
        let verdict = validate(
            StatusCode::OK,
            &headers(&[
                ("content-type", "Text/HTML; Charset=\"ISO-8859-1\""),
                ("content-length", "1024"),
            ]),
            1024,
        );
        assert_eq!(
            verdict,
            Ok(Verdict::Html(ContentInfo {
                mime: "text/html".to_string(),
                charset: Some("ISO-8859-1".to_string()),
            }))
        );
    }

    #[test]
    fn test_html_without_length_or_charset() {
        let verdict = validate(
            StatusCode::OK,
            &headers(&[("content-type", "text/html")]),
            1024,
        );
        assert_eq!(
            verdict,
            Ok(Verdict::Html(ContentInfo {
                mime: "text/html".to_string(),
                charset: None,
            }))
        );
    }
}
