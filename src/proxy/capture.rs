//! Body capture that never consumes the forwarded stream destructively
//!
//! A body is read frame by frame. If it ends within the capture limit, the
//! buffered bytes become both the captured copy and a fresh body to forward.
//! If it grows past the limit, only the first `limit` bytes are retained and
//! the body handed onward replays the chunks already read in front of the
//! untouched remainder, so the full payload still streams through.

use crate::proxy::types::CaptureLimit;
use axum::body::Body;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};
use http_body_util::BodyExt;
use serde::{Serialize, Serializer};

/// Bytes retained for history from one body
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CapturedBody {
    #[serde(serialize_with = "serialize_base64")]
    bytes: Bytes,
    truncated: bool,
}

impl CapturedBody {
    /// A capture holding the whole body
    pub fn complete(bytes: Bytes) -> Self {
        Self {
            bytes,
            truncated: false,
        }
    }

    /// A capture holding only the first part of a larger body
    pub fn truncated(bytes: Bytes) -> Self {
        Self {
            bytes,
            truncated: true,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// True when the body was larger than the capture limit
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lossy UTF-8 view, for display
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

fn serialize_base64<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Capture a body and return it together with an equivalent body to forward.
///
/// Errors are only reported while the capture window is being read; an error
/// in the streamed remainder surfaces to whoever consumes the returned body.
pub async fn tee_body(body: Body, limit: CaptureLimit) -> Result<(CapturedBody, Body), axum::Error> {
    let limit = limit.into_inner();
    let mut body = body;
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut seen = 0usize;

    while let Some(frame) = body.frame().await {
        // Trailers are not captured and not replayed
        let Ok(data) = frame?.into_data() else {
            continue;
        };
        if data.is_empty() {
            continue;
        }

        seen += data.len();
        chunks.push(data);

        if seen > limit {
            let captured = CapturedBody::truncated(prefix_of(&chunks, limit));
            let replay = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
            let forward = Body::from_stream(replay.chain(body.into_data_stream()));
            return Ok((captured, forward));
        }
    }

    let bytes = concat(chunks, seen);
    Ok((CapturedBody::complete(bytes.clone()), Body::from(bytes)))
}

/// Copy of the first `limit` bytes, detached from the chunk allocations
fn prefix_of(chunks: &[Bytes], limit: usize) -> Bytes {
    let mut prefix = BytesMut::with_capacity(limit);
    for chunk in chunks {
        let remaining = limit - prefix.len();
        if remaining == 0 {
            break;
        }
        prefix.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
    }
    prefix.freeze()
}

fn concat(mut chunks: Vec<Bytes>, total: usize) -> Bytes {
    match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.remove(0),
        _ => {
            let mut buffer = BytesMut::with_capacity(total);
            for chunk in &chunks {
                buffer.extend_from_slice(chunk);
            }
            buffer.freeze()
        }
    }
}
