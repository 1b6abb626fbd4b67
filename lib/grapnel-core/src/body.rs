//! Request content, response bodies and serialization helpers.
//!
//! - [`RequestContent`] - request payload, either buffered (rewindable) or a one-shot stream
//! - [`ResponseBody`] - single-owner response payload that is closed exactly once

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{Error, Result};

/// A streaming body: chunks of bytes arriving over time.
pub type StreamingBody = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Content type for request and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Request Content
// ============================================================================

enum ContentInner {
    Buffered { data: Bytes, consumed: bool },
    Streaming(Option<StreamingBody>),
}

/// Payload of a [`crate::RequestInformation`].
///
/// Buffered content behaves like a marked stream: reading it marks it as
/// consumed and [`RequestContent::rewind`] resets it so it can be sent again.
/// Streaming content can be read once and never rewound.
pub struct RequestContent {
    inner: ContentInner,
}

impl RequestContent {
    /// Buffered, rewindable content.
    #[must_use]
    pub fn buffered(data: impl Into<Bytes>) -> Self {
        Self {
            inner: ContentInner::Buffered {
                data: data.into(),
                consumed: false,
            },
        }
    }

    /// One-shot streaming content.
    #[must_use]
    pub fn streaming<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: ContentInner::Streaming(Some(Box::pin(stream))),
        }
    }

    /// Returns `true` if the content can be sent again after a rewind.
    #[must_use]
    pub const fn is_rewindable(&self) -> bool {
        matches!(self.inner, ContentInner::Buffered { .. })
    }

    /// Returns `true` if the content was read and not rewound since.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        match &self.inner {
            ContentInner::Buffered { consumed, .. } => *consumed,
            ContentInner::Streaming(stream) => stream.is_none(),
        }
    }

    /// Reset the content to its start.
    ///
    /// # Errors
    ///
    /// Returns an error for streaming content.
    pub fn rewind(&mut self) -> Result<()> {
        match &mut self.inner {
            ContentInner::Buffered { consumed, .. } => {
                *consumed = false;
                Ok(())
            }
            ContentInner::Streaming(_) => Err(Error::invalid_request(
                "streaming request content cannot be rewound",
            )),
        }
    }

    /// Read the whole content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content was already consumed, or if a chunk
    /// of streaming content fails.
    pub async fn read(&mut self) -> Result<Bytes> {
        match &mut self.inner {
            ContentInner::Buffered { data, consumed } => {
                if *consumed {
                    return Err(Error::invalid_request(
                        "request content was already consumed, rewind it before sending it again",
                    ));
                }
                *consumed = true;
                Ok(data.clone())
            }
            ContentInner::Streaming(stream) => {
                let Some(mut stream) = stream.take() else {
                    return Err(Error::invalid_request(
                        "streaming request content was already consumed",
                    ));
                };
                let mut collected = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    collected.extend_from_slice(&chunk?);
                }
                Ok(collected.freeze())
            }
        }
    }
}

impl fmt::Debug for RequestContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ContentInner::Buffered { data, consumed } => f
                .debug_struct("RequestContent::Buffered")
                .field("len", &data.len())
                .field("consumed", consumed)
                .finish(),
            ContentInner::Streaming(stream) => f
                .debug_struct("RequestContent::Streaming")
                .field("consumed", &stream.is_none())
                .finish(),
        }
    }
}

impl From<Bytes> for RequestContent {
    fn from(data: Bytes) -> Self {
        Self::buffered(data)
    }
}

// ============================================================================
// Response Body
// ============================================================================

enum BodyInner {
    Full(Option<Bytes>),
    Streaming(StreamingBody),
    Closed,
}

/// Payload of a [`crate::Response`].
///
/// The body has a single owner. It is released exactly once: by
/// [`ResponseBody::close`], at the end of [`ResponseBody::bytes`], or when it
/// is dropped. A hook registered with [`ResponseBody::on_close`] observes the
/// release.
///
/// The body is also a [`Stream`] of chunks, so it can be handed to a caller
/// as a raw byte stream.
pub struct ResponseBody {
    inner: BodyInner,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl ResponseBody {
    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// A body backed by bytes already in memory.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            inner: BodyInner::Full(Some(data.into())),
            on_close: None,
        }
    }

    /// A body backed by a stream of chunks.
    #[must_use]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: BodyInner::Streaming(Box::pin(stream)),
            on_close: None,
        }
    }

    /// Register a hook that runs when the body is released.
    #[must_use]
    pub fn on_close(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Read the whole body, then release it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading any chunk fails. The body is released on
    /// failure too.
    pub async fn bytes(mut self) -> Result<Bytes> {
        if let BodyInner::Full(data) = &mut self.inner {
            let data = data.take().unwrap_or_default();
            self.close();
            return Ok(data);
        }

        let mut collected = BytesMut::new();
        while let Some(chunk) = self.next().await {
            collected.extend_from_slice(&chunk?);
        }
        self.close();
        Ok(collected.freeze())
    }

    /// Release the body without reading it.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.inner = BodyInner::Closed;
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Stream for ResponseBody {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match &mut this.inner {
            BodyInner::Full(data) => Poll::Ready(data.take().filter(|d| !d.is_empty()).map(Ok)),
            BodyInner::Streaming(stream) => stream.as_mut().poll_next(cx),
            BodyInner::Closed => Poll::Ready(None),
        }
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            BodyInner::Full(_) => "full",
            BodyInner::Streaming(_) => "streaming",
            BodyInner::Closed => "closed",
        };
        f.debug_struct("ResponseBody").field("kind", &kind).finish()
    }
}

impl From<Bytes> for ResponseBody {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

// ============================================================================
// JSON helpers
// ============================================================================

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use grapnel_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Handy inside a custom [`crate::ResponseHandler`] that works on raw bytes.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
///
/// # Example
///
/// ```
/// use grapnel_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_json(br#"{"name":"Alice"}"#).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| Error::deserialization(e.path().to_string(), e.inner().to_string()))
}
