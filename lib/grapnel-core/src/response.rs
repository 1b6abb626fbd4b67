//! HTTP response handling.
//!
//! [`Response`] provides access to status, multi-valued headers, content type
//! and the single-use [`ResponseBody`].
//!
//! # Example
//!
//! ```ignore
//! let content_type = response.content_type();
//! let payload = response.into_body().bytes().await?;
//! ```

use bytes::Bytes;
use http::HeaderMap;
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};

use crate::{ResponseBody, Result};

/// HTTP response with status, headers, and body.
#[derive(Debug)]
pub struct Response<B = ResponseBody> {
    status: u16,
    headers: HeaderMap,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every text value of a repeated header, in order.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + use<'a, B> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }

    /// `WWW-Authenticate` challenges, in order.
    pub fn authenticate_challenges(&self) -> impl Iterator<Item = &str> {
        self.header_values(WWW_AUTHENTICATE.as_str())
    }

    /// Media type of the body: lower-cased, without parameters.
    ///
    /// `application/json; charset=utf-8` gives `application/json`.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        let raw = self.header(CONTENT_TYPE.as_str())?;
        let media_type = raw.split(';').next()?.trim();
        (!media_type.is_empty()).then(|| media_type.to_ascii_lowercase())
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HeaderMap, B) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 204 No Content.
    #[must_use]
    pub const fn is_no_content(&self) -> bool {
        self.status == 204
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Transform the body with a function.
    pub fn map_body<F, B2>(self, f: F) -> Response<B2>
    where
        F: FnOnce(B) -> B2,
    {
        Response {
            status: self.status,
            headers: self.headers,
            body: f(self.body),
        }
    }
}

impl Response<ResponseBody> {
    /// Release the body without reading it.
    pub fn close(self) {
        self.body.close();
    }

    /// Read the whole body, releasing it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails.
    pub async fn bytes(self) -> Result<Bytes> {
        self.body.bytes().await
    }

    /// Read the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        crate::from_json(&bytes)
    }

    /// Read the body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the body is not valid UTF-8.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| crate::Error::deserialization("", e.to_string()))
    }
}
