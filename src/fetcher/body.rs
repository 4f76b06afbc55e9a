//! Bounded streaming body capture

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use futures::{Stream, StreamExt};
use tracing::debug;

/// Decoded body text and how much of it was kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedBody {
    /// Body decoded with the response charset
    pub text: String,
    /// Number of raw bytes kept
    pub len: usize,
    /// Whether bytes past the ceiling were dropped.
    ///
    /// A body that fills the ceiling exactly stops the read without looking
    /// for more, and reports `false`.
    pub truncated: bool,
}

/// Read a chunk stream into memory, keeping at most `ceiling` bytes.
///
/// Chunks are pulled one at a time. Once the next chunk would cross the
/// ceiling, the bytes that still fit are kept and the stream is not polled
/// again, so a missing or understated `Content-Length` cannot grow the
/// buffer past the ceiling.
pub async fn read_bounded<S, E>(
    chunks: S,
    ceiling: u64,
    charset: Option<&str>,
) -> Result<BoundedBody, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut chunks = std::pin::pin!(chunks);
    let ceiling = usize::try_from(ceiling).unwrap_or(usize::MAX);
    let mut buffer = Vec::new();
    let mut truncated = false;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let room = ceiling - buffer.len();
        if chunk.len() > room {
            buffer.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        buffer.extend_from_slice(&chunk);
        if buffer.len() == ceiling {
            break;
        }
    }

    if truncated {
        debug!(ceiling, "body truncated at ceiling");
    }

    Ok(BoundedBody {
        text: decode(&buffer, charset),
        len: buffer.len(),
        truncated,
    })
}

/// Decode bytes with a WHATWG charset label, falling back to UTF-8
pub fn decode(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "body contained malformed sequences");
    }
    text.into_owned()
}
